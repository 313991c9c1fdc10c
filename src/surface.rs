use glam::{Vec2, Vec3};

use crate::error::Result;
use crate::grow::*;
use crate::model::ShaderId;
use crate::shader::Color;

pub const MAX_SPECIAL: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceType {
    Bad,
    Triangles,
    Patch,
}

impl Default for SurfaceType {
    fn default() -> Self {
        SurfaceType::Bad
    }
}

/// One shader-homogeneous chunk of geometry.
///
/// Positions, normals, smoothing groups and every ST/color channel always
/// share the same logical length; writing vertex `i` anywhere grows all of
/// them together.
#[derive(Debug, Clone)]
pub struct Surface {
    kind: SurfaceType,
    name: String,
    shader: Option<ShaderId>,
    xyz: GrowableArray<Vec3>,
    normal: GrowableArray<Vec3>,
    smoothing_group: GrowableArray<i32>,
    st: GrowableArray<GrowableArray<Vec2>>,
    color: GrowableArray<GrowableArray<Color>>,
    index: GrowableArray<u32>,
    face_normal: GrowableArray<Vec3>,
    special: [i32; MAX_SPECIAL],
}

impl Default for Surface {
    fn default() -> Self {
        Surface {
            kind: SurfaceType::Bad,
            name: String::new(),
            shader: None,
            xyz: GrowableArray::new(GROW_VERTEXES),
            normal: GrowableArray::new(GROW_VERTEXES),
            smoothing_group: GrowableArray::new(GROW_VERTEXES),
            st: GrowableArray::new(GROW_ARRAYS),
            color: GrowableArray::new(GROW_ARRAYS),
            index: GrowableArray::new(GROW_INDEXES),
            face_normal: GrowableArray::new(GROW_FACES),
            special: [0; MAX_SPECIAL],
        }
    }
}

impl Surface {
    pub fn kind(&self) -> SurfaceType {
        self.kind
    }

    pub fn set_kind(&mut self, kind: SurfaceType) {
        self.kind = kind;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn shader(&self) -> Option<ShaderId> {
        self.shader
    }

    pub fn set_shader(&mut self, shader: Option<ShaderId>) {
        self.shader = shader;
    }

    /// Grows (never shrinks) every array to hold the requested counts.
    pub fn adjust(
        &mut self,
        vertexes: usize,
        st_channels: usize,
        color_channels: usize,
        indexes: usize,
        face_normals: usize,
    ) -> Result<()> {
        if vertexes > self.xyz.len() {
            self.xyz.grow_to(vertexes)?;
            self.normal.grow_to(vertexes)?;
            self.smoothing_group.grow_to(vertexes)?;
            for channel in self.st.iter_mut() {
                channel.grow_to(vertexes)?;
            }
            for channel in self.color.iter_mut() {
                channel.grow_to(vertexes)?;
            }
        }

        let len = self.xyz.len();
        while self.st.len() < st_channels {
            let mut channel = GrowableArray::new(GROW_VERTEXES);
            channel.grow_to(len)?;
            self.st.push(channel)?;
        }
        while self.color.len() < color_channels {
            let mut channel = GrowableArray::new(GROW_VERTEXES);
            channel.grow_to(len)?;
            self.color.push(channel)?;
        }

        self.index.grow_to(indexes)?;
        self.face_normal.grow_to(face_normals)?;
        Ok(())
    }

    pub fn num_vertexes(&self) -> usize {
        self.xyz.len()
    }

    pub fn num_st_channels(&self) -> usize {
        self.st.len()
    }

    pub fn num_color_channels(&self) -> usize {
        self.color.len()
    }

    pub fn num_indexes(&self) -> usize {
        self.index.len()
    }

    pub fn num_face_normals(&self) -> usize {
        self.face_normal.len()
    }

    // Bounds live on the model, so position writes go through
    // `Model::set_surface_xyz`.
    pub(crate) fn write_xyz(&mut self, num: usize, xyz: Vec3) -> Result<()> {
        self.adjust(num + 1, 0, 0, 0, 0)?;
        self.xyz.set(num, xyz)
    }

    pub fn set_normal(&mut self, num: usize, normal: Vec3) -> Result<()> {
        self.adjust(num + 1, 0, 0, 0, 0)?;
        self.normal.set(num, normal)
    }

    pub fn set_st(&mut self, channel: usize, num: usize, st: Vec2) -> Result<()> {
        self.adjust(num + 1, channel + 1, 0, 0, 0)?;
        self.st.as_mut_slice()[channel].set(num, st)
    }

    pub fn set_color(&mut self, channel: usize, num: usize, color: Color) -> Result<()> {
        self.adjust(num + 1, 0, channel + 1, 0, 0)?;
        self.color.as_mut_slice()[channel].set(num, color)
    }

    pub fn set_smoothing_group(&mut self, num: usize, group: i32) -> Result<()> {
        self.adjust(num + 1, 0, 0, 0, 0)?;
        self.smoothing_group.set(num, group)
    }

    /// Index values are stored as given, even when they point past the
    /// vertex arrays.
    pub fn set_index(&mut self, num: usize, index: u32) -> Result<()> {
        self.adjust(0, 0, 0, num + 1, 0)?;
        self.index.set(num, index)
    }

    pub fn set_indices(&mut self, start: usize, indices: &[u32]) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }
        self.adjust(0, 0, 0, start + indices.len(), 0)?;
        self.index.as_mut_slice()[start..start + indices.len()].copy_from_slice(indices);
        Ok(())
    }

    pub fn set_face_normal(&mut self, num: usize, normal: Vec3) -> Result<()> {
        self.adjust(0, 0, 0, 0, num + 1)?;
        self.face_normal.set(num, normal)
    }

    /// Slots outside `0..MAX_SPECIAL` are ignored.
    pub fn set_special(&mut self, slot: usize, value: i32) {
        if let Some(special) = self.special.get_mut(slot) {
            *special = value;
        }
    }

    pub fn special(&self, slot: usize) -> i32 {
        self.special.get(slot).copied().unwrap_or(0)
    }

    pub fn xyz(&self, num: usize) -> Option<Vec3> {
        self.xyz.get(num).copied()
    }

    pub fn positions(&self) -> &[Vec3] {
        self.xyz.as_slice()
    }

    pub fn normal(&self, num: usize) -> Option<Vec3> {
        self.normal.get(num).copied()
    }

    pub fn normals(&self) -> &[Vec3] {
        self.normal.as_slice()
    }

    pub(crate) fn normals_mut(&mut self) -> &mut [Vec3] {
        self.normal.as_mut_slice()
    }

    pub fn smoothing_group(&self, num: usize) -> Option<i32> {
        self.smoothing_group.get(num).copied()
    }

    pub fn smoothing_groups(&self) -> &[i32] {
        self.smoothing_group.as_slice()
    }

    pub fn st(&self, channel: usize, num: usize) -> Option<Vec2> {
        self.st.get(channel).and_then(|c| c.get(num)).copied()
    }

    pub fn st_channel(&self, channel: usize) -> Option<&[Vec2]> {
        self.st.get(channel).map(|c| c.as_slice())
    }

    pub fn color(&self, channel: usize, num: usize) -> Option<Color> {
        self.color.get(channel).and_then(|c| c.get(num)).copied()
    }

    pub fn color_channel(&self, channel: usize) -> Option<&[Color]> {
        self.color.get(channel).map(|c| c.as_slice())
    }

    pub fn index(&self, num: usize) -> Option<u32> {
        self.index.get(num).copied()
    }

    pub fn indexes(&self) -> &[u32] {
        self.index.as_slice()
    }

    pub fn face_normal(&self, num: usize) -> Option<Vec3> {
        self.face_normal.get(num).copied()
    }

    pub fn face_normals(&self) -> &[Vec3] {
        self.face_normal.as_slice()
    }
}
