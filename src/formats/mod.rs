//! Built-in format modules.

pub mod md3;
pub mod mtl;
pub mod obj;

use crate::module::FormatModule;

pub use self::md3::Md3Module;
pub use self::obj::ObjModule;

/// Every built-in module, in dispatch order.
pub fn default_modules() -> Vec<Box<dyn FormatModule>> {
    vec![Box::new(Md3Module), Box::new(ObjModule)]
}
