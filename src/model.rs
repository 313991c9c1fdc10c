use std::any::Any;
use std::fmt;

use glam::Vec3;

use crate::error::{Error, Result};
use crate::grow::{GrowableArray, GROW_SHADERS, GROW_SURFACES};
use crate::module::ModuleInfo;
use crate::shader::Shader;
use crate::surface::Surface;

/// Position of a shader inside its owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub(crate) usize);

/// Position of a surface inside its owning model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub(crate) usize);

impl ShaderId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl SurfaceId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The unified in-memory model every format module produces.
///
/// Shaders and surfaces are kept in creation order, and their ids stay valid
/// for the lifetime of the model. Dropping the model releases everything it
/// owns, including partially built surfaces.
pub struct Model {
    name: String,
    file_name: String,
    frame: usize,
    num_frames: usize,
    mins: Vec3,
    maxs: Vec3,
    shaders: GrowableArray<Shader>,
    surfaces: GrowableArray<Surface>,
    module: Option<ModuleInfo>,
    data: Option<Box<dyn Any>>,
}

impl Default for Model {
    fn default() -> Self {
        Model::new()
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("frame", &self.frame)
            .field("num_frames", &self.num_frames)
            .field("mins", &self.mins)
            .field("maxs", &self.maxs)
            .field("shaders", &self.shaders)
            .field("surfaces", &self.surfaces)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new() -> Self {
        Model {
            name: String::new(),
            file_name: String::new(),
            frame: 0,
            num_frames: 1,
            mins: Vec3::splat(f32::INFINITY),
            maxs: Vec3::splat(f32::NEG_INFINITY),
            shaders: GrowableArray::new(GROW_SHADERS),
            surfaces: GrowableArray::new(GROW_SURFACES),
            module: None,
            data: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, file_name: &str) {
        self.file_name = file_name.to_string();
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn set_frame(&mut self, frame: usize) {
        self.frame = frame;
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn set_num_frames(&mut self, num_frames: usize) {
        self.num_frames = num_frames;
    }

    /// Module-specific payload attached during loading.
    pub fn data(&self) -> Option<&dyn Any> {
        self.data.as_deref()
    }

    pub fn set_data(&mut self, data: Box<dyn Any>) {
        self.data = Some(data);
    }

    /// The module that produced this model, set by the loader.
    pub fn module(&self) -> Option<&ModuleInfo> {
        self.module.as_ref()
    }

    pub(crate) fn set_module(&mut self, info: ModuleInfo) {
        self.module = Some(info);
    }

    /// Componentwise (min, max) over every position written so far.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        (self.mins, self.maxs)
    }

    pub fn num_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id.0)
    }

    pub fn shader_mut(&mut self, id: ShaderId) -> Option<&mut Shader> {
        self.shaders.get_mut(id.0)
    }

    pub fn shaders(&self) -> impl Iterator<Item = (ShaderId, &Shader)> {
        self.shaders.iter().enumerate().map(|(i, s)| (ShaderId(i), s))
    }

    /// Appends a shader with default colors.
    pub fn new_shader(&mut self) -> Result<ShaderId> {
        self.shaders.push(Shader::default()).map(ShaderId)
    }

    /// First shader whose name matches; empty names never match.
    pub fn find_shader(&self, name: &str, case_sensitive: bool) -> Option<ShaderId> {
        if name.is_empty() {
            return None;
        }
        self.shaders
            .iter()
            .position(|s| names_match(s.name(), name, case_sensitive))
            .map(ShaderId)
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0)
    }

    pub fn surface_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(id.0)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (SurfaceId, &Surface)> {
        self.surfaces.iter().enumerate().map(|(i, s)| (SurfaceId(i), s))
    }

    /// Appends an empty surface named `Unnamed_<n>`, `n` counting from 1.
    pub fn new_surface(&mut self) -> Result<SurfaceId> {
        let mut surface = Surface::default();
        surface.set_name(&format!("Unnamed_{}", self.surfaces.len() + 1));
        self.surfaces.push(surface).map(SurfaceId)
    }

    pub fn find_surface(&self, name: &str, case_sensitive: bool) -> Option<SurfaceId> {
        if name.is_empty() {
            return None;
        }
        self.surfaces
            .iter()
            .position(|s| names_match(s.name(), name, case_sensitive))
            .map(SurfaceId)
    }

    /// Writes vertex `num` of a surface and widens the model bounds. This is
    /// the only write that touches the bounds.
    pub fn set_surface_xyz(&mut self, id: SurfaceId, num: usize, xyz: Vec3) -> Result<()> {
        let surface = self.surfaces.get_mut(id.0).ok_or(Error::Invalid)?;
        surface.write_xyz(num, xyz)?;
        self.mins = self.mins.min(xyz);
        self.maxs = self.maxs.max(xyz);
        Ok(())
    }

    pub fn total_vertexes(&self) -> usize {
        self.surfaces.iter().map(|s| s.num_vertexes()).sum()
    }

    pub fn total_indexes(&self) -> usize {
        self.surfaces.iter().map(|s| s.num_indexes()).sum()
    }
}

fn names_match(candidate: &str, name: &str, case_sensitive: bool) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if case_sensitive {
        candidate == name
    } else {
        candidate.eq_ignore_ascii_case(name)
    }
}
