use std::fmt;

use crate::error::Result;
use crate::host::{Host, PrintLevel};
use crate::model::Model;

/// Descriptive metadata of a format module. Nothing here drives dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub version: &'static str,
    pub display_name: &'static str,
    pub author: &'static str,
    pub copyright: &'static str,
    pub default_extensions: &'static [&'static str],
}

/// Per-call state handed to a module's `load`.
pub struct LoadContext<'a> {
    pub host: &'a dyn Host,
    pub file_name: &'a str,
    pub frame: usize,
}

impl<'a> fmt::Debug for LoadContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadContext")
            .field("file_name", &self.file_name)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl<'a> LoadContext<'a> {
    pub fn new(host: &'a dyn Host, file_name: &'a str, frame: usize) -> Self {
        LoadContext {
            host,
            file_name,
            frame,
        }
    }

    pub fn print(&self, level: PrintLevel, message: &str) {
        self.host.print(level, message);
    }

    pub fn warn(&self, message: &str) {
        self.print(PrintLevel::Warning, message);
    }

    /// Loads a companion file (material library, skin, ...) through the host.
    /// `None` when the host cannot provide it.
    pub fn load_companion(&self, name: &str) -> Option<Vec<u8>> {
        match self.host.load_file(name) {
            Ok(buffer) => Some(buffer),
            Err(err) => {
                self.print(PrintLevel::Verbose, &format!("{}: {}", name, err));
                None
            }
        }
    }
}

/// A decoder for one file format.
pub trait FormatModule {
    fn info(&self) -> &ModuleInfo;

    /// Cheap probe: `Ok(())` if this module wants to parse `buffer`.
    fn can_load(&self, file_name: &str, buffer: &[u8]) -> Result<()>;

    fn load(&self, ctx: &LoadContext<'_>, buffer: &[u8]) -> Result<Model>;
}
