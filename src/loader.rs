use std::io::Read;

use crate::error::{Error, Result};
use crate::formats::default_modules;
use crate::host::{Host, PrintLevel};
use crate::model::Model;
use crate::module::{FormatModule, LoadContext, ModuleInfo};
use crate::path::set_extension;
use crate::remap::remap_model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Look for `<model>.remap` after a successful load.
    pub apply_remap: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions { apply_remap: true }
    }
}

/// Entry point: a host plus an ordered list of format modules.
///
/// Modules are tried in registry order and the first one that both accepts
/// and parses a buffer wins, so earlier modules shadow later ones.
pub struct Loader<H: Host> {
    host: H,
    modules: Vec<Box<dyn FormatModule>>,
    options: LoadOptions,
}

impl<H: Host> Loader<H> {
    /// A loader over every built-in format.
    pub fn new(host: H) -> Self {
        Loader::with_modules(host, default_modules())
    }

    pub fn with_modules(host: H, modules: Vec<Box<dyn FormatModule>>) -> Self {
        Loader {
            host,
            modules,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// Metadata of the registered modules, in dispatch order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.iter().map(|m| m.info())
    }

    /// Loads `file_name` through the host and dispatches it.
    pub fn load_model(&self, file_name: &str, frame: usize) -> Result<Model> {
        if file_name.is_empty() {
            self.host.print(PrintLevel::Error, "load_model: no filename given");
            return Err(Error::NoFileName);
        }

        let buffer = match self.host.load_file(file_name) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.host.print(
                    PrintLevel::Error,
                    &format!("load_model: failed loading model {}: {}", file_name, err),
                );
                return Err(Error::FileLoad(file_name.to_string()));
            }
        };

        let result = self.dispatch(file_name, &buffer, frame);
        self.host.release_file(buffer);
        result
    }

    /// Dispatches a buffer the caller already holds.
    pub fn load_model_buffer(&self, file_name: &str, buffer: &[u8], frame: usize) -> Result<Model> {
        self.dispatch(file_name, buffer, frame)
    }

    /// Reads at most `stream_length` bytes from `reader` and hands them to
    /// `module` alone; no other module is tried.
    pub fn load_model_stream<R: Read>(
        &self,
        module: &dyn FormatModule,
        reader: R,
        stream_length: usize,
        frame: usize,
        file_name: &str,
    ) -> Result<Model> {
        if stream_length == 0 {
            self.host.print(PrintLevel::Error, "load_model_stream: empty input stream");
            return Err(Error::EmptyStream);
        }

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(stream_length + 1)?;
        if let Err(err) = reader.take(stream_length as u64).read_to_end(&mut buffer) {
            self.host.print(
                PrintLevel::Error,
                &format!("load_model_stream: read failed: {}", err),
            );
            return Err(Error::FileLoad(file_name.to_string()));
        }
        let len = buffer.len();
        buffer.push(0);

        self.try_module(module, file_name, &buffer[..len], frame)
    }

    fn dispatch(&self, file_name: &str, buffer: &[u8], frame: usize) -> Result<Model> {
        for module in &self.modules {
            match self.try_module(module.as_ref(), file_name, buffer, frame) {
                Ok(model) => return Ok(model),
                Err(Error::Memory(err)) => return Err(Error::Memory(err)),
                Err(_) => continue,
            }
        }

        self.host.print(
            PrintLevel::Verbose,
            &format!("load_model: no module recognized {}", file_name),
        );
        Err(Error::Unrecognized(file_name.to_string()))
    }

    fn try_module(
        &self,
        module: &dyn FormatModule,
        file_name: &str,
        buffer: &[u8],
        frame: usize,
    ) -> Result<Model> {
        let info = module.info();
        if let Err(err) = module.can_load(file_name, buffer) {
            self.host.print(
                PrintLevel::Verbose,
                &format!("{}: declined {} ({})", info.display_name, file_name, err),
            );
            return Err(err);
        }

        let ctx = LoadContext::new(&self.host, file_name, frame);
        let mut model = match module.load(&ctx, buffer) {
            Ok(model) => model,
            Err(err) => {
                self.host.print(
                    PrintLevel::Error,
                    &format!("{}: failed to load {}: {}", info.display_name, file_name, err),
                );
                return Err(err);
            }
        };

        model.set_module(info.clone());
        if model.file_name().is_empty() {
            model.set_file_name(file_name);
        }
        if self.options.apply_remap {
            self.remap(&mut model);
        }
        Ok(model)
    }

    fn remap(&self, model: &mut Model) {
        if model.file_name().is_empty() {
            return;
        }
        let remap_file = set_extension(model.file_name(), "remap");
        if let Err(err) = remap_model(model, &self.host, &remap_file) {
            self.host.print(
                PrintLevel::Verbose,
                &format!("{}: not applied ({})", remap_file, err),
            );
        }
    }
}
