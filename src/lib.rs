//! Loads 3D models from several file formats into one common in-memory
//! representation: a [`Model`] made of [`Surface`]s that reference
//! [`Shader`]s.
//!
//! ```no_run
//! use modelimport::{FileSystemHost, Loader};
//!
//! let loader = Loader::new(FileSystemHost::new());
//! let model = loader.load_model("models/box.md3", 0)?;
//! for (_, surface) in model.surfaces() {
//!     println!("{}: {} triangles", surface.name(), surface.num_indexes() / 3);
//! }
//! # Ok::<(), modelimport::Error>(())
//! ```

pub mod error;
pub mod formats;
pub mod grow;
pub mod host;
mod loader;
pub mod model;
pub mod module;
mod normals;
pub mod path;
pub mod remap;
pub mod shader;
pub mod surface;
pub mod tokenizer;
mod triangles;
pub mod vertex_hash;

pub use self::error::{Error, Result, Status};
pub use self::grow::GrowableArray;
pub use self::host::{FileSystemHost, Host, MemoryHost, PrintLevel};
pub use self::loader::{LoadOptions, Loader};
pub use self::model::{Model, ShaderId, SurfaceId};
pub use self::module::{FormatModule, LoadContext, ModuleInfo};
pub use self::normals::fix_surface_normals;
pub use self::remap::{apply_remap, remap_model};
pub use self::shader::{Color, Shader, WHITE};
pub use self::surface::{Surface, SurfaceType};
pub use self::triangles::{add_triangle_to_model, find_surface_vertex_num, Corner};
pub use self::vertex_hash::{HashPolicy, VertexCombination, VertexCombinationTable};
