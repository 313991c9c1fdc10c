//! Single-triangle ingestion for handlers that do not batch their geometry.

use glam::{Vec2, Vec3};

use crate::error::{Error, Result};
use crate::model::{Model, ShaderId, SurfaceId};
use crate::shader::Color;
use crate::surface::{Surface, SurfaceType};

/// All attributes of one triangle corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner<'a> {
    pub xyz: Vec3,
    pub normal: Vec3,
    /// One UV per channel.
    pub st: &'a [Vec2],
    /// One color per channel.
    pub color: &'a [Color],
    pub smoothing_group: i32,
}

/// Linear scan for a vertex whose every attribute equals `corner`.
///
/// Exact comparison over position, normal, smoothing group and each supplied
/// ST/color channel. Quadratic over a whole surface, so format handlers with
/// real vertex counts go through `VertexCombinationTable` instead.
pub fn find_surface_vertex_num(surface: &Surface, corner: &Corner<'_>) -> Option<usize> {
    (0..surface.num_vertexes()).find(|&i| {
        surface.xyz(i) == Some(corner.xyz)
            && surface.normal(i) == Some(corner.normal)
            && surface.smoothing_group(i) == Some(corner.smoothing_group)
            && corner
                .st
                .iter()
                .enumerate()
                .all(|(ch, st)| surface.st(ch, i) == Some(*st))
            && corner
                .color
                .iter()
                .enumerate()
                .all(|(ch, color)| surface.color(ch, i) == Some(*color))
    })
}

/// Adds a triangle to the surface keyed by `(name, shader)`, creating the
/// surface when no existing one matches.
///
/// A `None` name matches any surface carrying `shader`. New surfaces take
/// `name`, or the shader's name when `name` is `None`.
pub fn add_triangle_to_model(
    model: &mut Model,
    corners: &[Corner<'_>; 3],
    shader: Option<ShaderId>,
    name: Option<&str>,
) -> Result<SurfaceId> {
    let existing = model
        .surfaces()
        .find(|(_, s)| name.map_or(true, |n| s.name() == n) && s.shader() == shader)
        .map(|(id, _)| id);

    let id = match existing {
        Some(id) => id,
        None => {
            let surface_name = match name {
                Some(n) => n.to_string(),
                None => shader
                    .and_then(|s| model.shader(s))
                    .map(|s| s.name().to_string())
                    .unwrap_or_default(),
            };
            let id = model.new_surface()?;
            let surface = model.surface_mut(id).ok_or(Error::Invalid)?;
            surface.set_kind(SurfaceType::Triangles);
            if !surface_name.is_empty() {
                surface.set_name(&surface_name);
            }
            surface.set_shader(shader);
            id
        }
    };

    for corner in corners {
        let surface = model.surface(id).ok_or(Error::Invalid)?;
        let vertex = match find_surface_vertex_num(surface, corner) {
            Some(v) => v,
            None => {
                let v = surface.num_vertexes();
                model.set_surface_xyz(id, v, corner.xyz)?;
                let surface = model.surface_mut(id).ok_or(Error::Invalid)?;
                surface.set_normal(v, corner.normal)?;
                surface.set_smoothing_group(v, corner.smoothing_group)?;
                for (ch, st) in corner.st.iter().enumerate() {
                    surface.set_st(ch, v, *st)?;
                }
                for (ch, color) in corner.color.iter().enumerate() {
                    surface.set_color(ch, v, *color)?;
                }
                v
            }
        };

        let surface = model.surface_mut(id).ok_or(Error::Invalid)?;
        let slot = surface.num_indexes();
        surface.set_index(slot, vertex as u32)?;
    }

    Ok(id)
}
