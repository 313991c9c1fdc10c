use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Severity passed to [`Host::print`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintLevel {
    Normal,
    Verbose,
    Warning,
    Error,
    Fatal,
}

/// Capabilities the embedding application supplies to the loader.
///
/// Memory management is ordinary Rust ownership, so the host only provides
/// file access and message output.
pub trait Host {
    /// Reads a whole file. An empty vector means the file exists but is empty.
    fn load_file(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Hands a buffer from `load_file` back once the loader is done with it.
    fn release_file(&self, buffer: Vec<u8>) {
        drop(buffer);
    }

    fn print(&self, level: PrintLevel, message: &str) {
        match level {
            PrintLevel::Normal => log::info!("{}", message),
            PrintLevel::Verbose => log::debug!("{}", message),
            PrintLevel::Warning => log::warn!("{}", message),
            PrintLevel::Error => log::error!("{}", message),
            PrintLevel::Fatal => log::error!("fatal: {}", message),
        }
    }
}

impl<H: Host + ?Sized> Host for &H {
    fn load_file(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).load_file(name)
    }

    fn release_file(&self, buffer: Vec<u8>) {
        (**self).release_file(buffer)
    }

    fn print(&self, level: PrintLevel, message: &str) {
        (**self).print(level, message)
    }
}

/// Reads files from disk, optionally relative to a base directory.
#[derive(Debug, Clone, Default)]
pub struct FileSystemHost {
    root: Option<PathBuf>,
}

impl FileSystemHost {
    pub fn new() -> Self {
        FileSystemHost { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        FileSystemHost {
            root: Some(root.into()),
        }
    }
}

impl Host for FileSystemHost {
    fn load_file(&self, name: &str) -> io::Result<Vec<u8>> {
        match &self.root {
            Some(root) => fs::read(root.join(name)),
            None => fs::read(name),
        }
    }
}

/// Serves files from an in-memory map, keyed by the exact name passed to
/// the loader.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        MemoryHost::default()
    }

    pub fn insert(&mut self, name: &str, contents: impl Into<Vec<u8>>) {
        self.files.insert(name.to_string(), contents.into());
    }

    pub fn with_file(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

impl Host for MemoryHost {
    fn load_file(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }
}
