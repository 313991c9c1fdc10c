use std::cmp::Ordering;
use std::collections::BTreeMap;

use glam::Vec3;

use crate::error::Result;
use crate::surface::Surface;

const UNIT_LENGTH_EPSILON: f32 = 0.01;

/// Key ordering vertexes by position, then smoothing group.
#[derive(Debug, Clone, Copy)]
struct SmoothKey {
    xyz: Vec3,
    group: i32,
}

impl Ord for SmoothKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.xyz
            .x
            .total_cmp(&other.xyz.x)
            .then(self.xyz.y.total_cmp(&other.xyz.y))
            .then(self.xyz.z.total_cmp(&other.xyz.z))
            .then(self.group.cmp(&other.group))
    }
}

impl PartialOrd for SmoothKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SmoothKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SmoothKey {}

/// Sums un-normalized face cross products into each triangle corner.
/// Triangles with an index past the vertex arrays are skipped.
fn weighted_normals(positions: &[Vec3], indexes: &[u32], out: &mut [Vec3]) {
    for tri in indexes.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let ba = positions[b] - positions[a];
        let ca = positions[c] - positions[a];
        let weighted = ca.cross(ba);
        out[a] += weighted;
        out[b] += weighted;
        out[c] += weighted;
    }
}

/// Vertexes sharing an exact position and smoothing group end up with the
/// sum of all their contributions.
fn combine_shared(positions: &[Vec3], groups: &[i32], normals: &mut [Vec3]) {
    let mut representative: BTreeMap<SmoothKey, usize> = BTreeMap::new();
    let mut members = Vec::with_capacity(positions.len());

    for (i, (&xyz, &group)) in positions.iter().zip(groups).enumerate() {
        let key = SmoothKey { xyz, group };
        match representative.get(&key) {
            Some(&rep) => {
                let n = normals[i];
                normals[rep] += n;
                members.push(rep);
            }
            None => {
                representative.insert(key, i);
                members.push(i);
            }
        }
    }

    for (i, &rep) in members.iter().enumerate() {
        normals[i] = normals[rep];
    }
}

/// Regenerates vertex normals from triangle geometry.
///
/// Supplied normals survive when they are unit length and face the same
/// hemisphere as the generated one; anything else is replaced.
pub fn fix_surface_normals(surface: &mut Surface) -> Result<()> {
    let count = surface.num_vertexes();
    let mut generated = Vec::new();
    generated.try_reserve_exact(count)?;
    generated.resize(count, Vec3::ZERO);

    weighted_normals(surface.positions(), surface.indexes(), &mut generated);
    combine_shared(surface.positions(), surface.smoothing_groups(), &mut generated);

    for n in generated.iter_mut() {
        *n = n.normalize_or_zero();
    }

    for (original, generated) in surface.normals_mut().iter_mut().zip(&generated) {
        let unit = (original.length() - 1.0).abs() < UNIT_LENGTH_EPSILON;
        let facing = original.dot(*generated) > 0.0;
        if !unit || !facing {
            *original = *generated;
        }
    }
    Ok(())
}
