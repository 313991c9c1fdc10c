//! Epsilon-tolerant vertex deduplication.
//!
//! Many formats store the same logical vertex once per face, often with
//! slightly different floats after re-export. The table maps a
//! (position, normal, UV, color) combination to the vertex index it was first
//! assigned in the destination surface.
//!
//! Only the position feeds the hash. It is snapped to an epsilon grid first,
//! so the bucket is a coarse partition and [`VertexCombinationTable::find`]
//! decides equality with per-attribute tolerances.

use glam::{Vec2, Vec3};

use crate::error::Result;
use crate::shader::Color;

/// Prime bucket count.
pub const HASH_TABLE_SIZE: usize = 7919;

pub const XYZ_EPSILON: f32 = 0.01;
pub const NORMAL_EPSILON: f32 = 0.02;
pub const ST_EPSILON: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HashPolicy {
    /// Attributes match when every component is within its epsilon.
    Epsilon { xyz: f32, normal: f32, st: f32 },
    /// Bitwise float equality.
    Exact,
}

impl Default for HashPolicy {
    fn default() -> Self {
        HashPolicy::Epsilon {
            xyz: XYZ_EPSILON,
            normal: NORMAL_EPSILON,
            st: ST_EPSILON,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexCombination {
    pub xyz: Vec3,
    pub normal: Vec3,
    pub st: Vec2,
    pub color: Color,
}

#[derive(Debug)]
struct Entry {
    vcd: VertexCombination,
    index: u32,
    next: Option<u32>,
}

/// Bucketed table with singly linked collision chains.
///
/// Entries are never removed; the table is meant to live for one geometry
/// block and then be dropped.
#[derive(Debug)]
pub struct VertexCombinationTable {
    policy: HashPolicy,
    buckets: Vec<Option<u32>>,
    entries: Vec<Entry>,
}

impl Default for VertexCombinationTable {
    fn default() -> Self {
        VertexCombinationTable::new()
    }
}

impl VertexCombinationTable {
    pub fn new() -> Self {
        VertexCombinationTable::with_policy(HashPolicy::default())
    }

    pub fn with_policy(policy: HashPolicy) -> Self {
        VertexCombinationTable {
            policy,
            buckets: vec![None; HASH_TABLE_SIZE],
            entries: Vec::new(),
        }
    }

    pub fn policy(&self) -> HashPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bucket of a position under this table's policy.
    pub fn hash(&self, xyz: Vec3) -> usize {
        match self.policy {
            HashPolicy::Epsilon { xyz: eps, .. } => {
                let cell = cell_of(xyz, eps);
                mix(cell.x, cell.y, cell.z)
            }
            HashPolicy::Exact => mix(xyz.x, xyz.y, xyz.z),
        }
    }

    /// Vertex index of an earlier combination matching `vcd`, if any.
    ///
    /// In epsilon mode a position near a grid line can have its matches in
    /// the neighbouring cell, so every cell within `xyz` epsilon is probed,
    /// the position's own cell first.
    pub fn find(&self, vcd: &VertexCombination) -> Option<u32> {
        match self.policy {
            HashPolicy::Exact => self.find_in_bucket(self.hash(vcd.xyz), vcd),
            HashPolicy::Epsilon { xyz: eps, .. } => {
                let home = self.hash(vcd.xyz);
                if let Some(index) = self.find_in_bucket(home, vcd) {
                    return Some(index);
                }

                let cell = cell_of(vcd.xyz, eps);
                let low = cell_of(vcd.xyz - Vec3::splat(eps), eps);
                let high = cell_of(vcd.xyz + Vec3::splat(eps), eps);
                let xs = axis_cells(low.x, cell.x, high.x);
                let ys = axis_cells(low.y, cell.y, high.y);
                let zs = axis_cells(low.z, cell.z, high.z);

                let mut probed = vec![home];
                for &x in &xs {
                    for &y in &ys {
                        for &z in &zs {
                            let bucket = mix(x, y, z);
                            if probed.contains(&bucket) {
                                continue;
                            }
                            probed.push(bucket);
                            if let Some(index) = self.find_in_bucket(bucket, vcd) {
                                return Some(index);
                            }
                        }
                    }
                }
                None
            }
        }
    }

    /// Prepends a combination to its bucket chain. Call only after `find`
    /// missed; the table does not dedupe on insert.
    pub fn insert(&mut self, vcd: VertexCombination, index: u32) -> Result<()> {
        let bucket = self.hash(vcd.xyz);
        self.entries.try_reserve(1)?;
        let slot = self.entries.len() as u32;
        self.entries.push(Entry {
            vcd,
            index,
            next: self.buckets[bucket],
        });
        self.buckets[bucket] = Some(slot);
        Ok(())
    }

    /// `find`, falling back to `insert` with `next_index` on a miss.
    /// Returns the resolved index and whether it was newly inserted.
    pub fn find_or_insert(&mut self, vcd: VertexCombination, next_index: u32) -> Result<(u32, bool)> {
        match self.find(&vcd) {
            Some(index) => Ok((index, false)),
            None => {
                self.insert(vcd, next_index)?;
                Ok((next_index, true))
            }
        }
    }

    fn find_in_bucket(&self, bucket: usize, vcd: &VertexCombination) -> Option<u32> {
        let mut cursor = self.buckets[bucket];
        while let Some(slot) = cursor {
            let entry = &self.entries[slot as usize];
            if self.matches(&entry.vcd, vcd) {
                return Some(entry.index);
            }
            cursor = entry.next;
        }
        None
    }

    fn matches(&self, a: &VertexCombination, b: &VertexCombination) -> bool {
        let same = match self.policy {
            HashPolicy::Epsilon { xyz, normal, st } => {
                within(a.xyz - b.xyz, xyz)
                    && within(a.normal - b.normal, normal)
                    && (a.st - b.st).abs().cmple(Vec2::splat(st)).all()
            }
            HashPolicy::Exact => a.xyz == b.xyz && a.normal == b.normal && a.st == b.st,
        };
        same && a.color == b.color
    }
}

fn within(delta: Vec3, eps: f32) -> bool {
    delta.abs().cmple(Vec3::splat(eps)).all()
}

fn cell_of(xyz: Vec3, eps: f32) -> Vec3 {
    // `+ 0.0` folds -0.0 into 0.0 so both land in the same bucket.
    (xyz / eps).floor() + Vec3::ZERO
}

fn axis_cells(low: f32, mid: f32, high: f32) -> Vec<f32> {
    let mut cells = vec![mid];
    if low != mid {
        cells.push(low);
    }
    if high != mid {
        cells.push(high);
    }
    cells
}

fn mix(x: f32, y: f32, z: f32) -> usize {
    let (x, y, z) = (x.to_bits(), y.to_bits(), z.to_bits());
    let mut hash: u32 = 0;
    hash = hash.wrapping_add(!(x << 15));
    hash ^= x >> 10;
    hash = hash.wrapping_add(y << 3);
    hash ^= y >> 6;
    hash = hash.wrapping_add(!(z << 11));
    hash ^= z >> 16;
    (hash % HASH_TABLE_SIZE as u32) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vcd(x: f32, y: f32, z: f32) -> VertexCombination {
        VertexCombination {
            xyz: Vec3::new(x, y, z),
            normal: Vec3::Z,
            st: Vec2::new(0.25, 0.75),
            color: [255, 255, 255, 255],
        }
    }

    #[test]
    fn test_hash_is_in_range() {
        let table = VertexCombinationTable::new();
        for p in &[Vec3::ZERO, Vec3::splat(-1e6), Vec3::new(123.4, -5.0, 0.001)] {
            assert!(table.hash(*p) < HASH_TABLE_SIZE);
        }
    }

    #[test]
    fn test_negative_zero_hashes_like_zero() {
        let table = VertexCombinationTable::new();
        assert_eq!(table.hash(Vec3::new(-0.0, 0.0, -0.0)), table.hash(Vec3::ZERO));
    }

    #[test]
    fn test_find_returns_first_assigned_index() {
        let mut table = VertexCombinationTable::new();
        let v = vcd(1.0, 2.0, 3.0);

        assert_eq!(table.find(&v), None);
        table.insert(v, 0).unwrap();
        assert_eq!(table.find(&v), Some(0));
        assert_eq!(table.find(&vcd(1.001, 2.0, 3.0)), Some(0));
        assert_eq!(table.find_or_insert(v, 7).unwrap(), (0, false));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_position_epsilon_boundary() {
        let mut table = VertexCombinationTable::new();
        let base = vcd(0.5, 0.5, 0.5);
        table.insert(base, 3).unwrap();

        let half = XYZ_EPSILON / 2.0;
        assert_eq!(table.find(&vcd(0.5 + half, 0.5, 0.5)), Some(3));
        assert_eq!(table.find(&vcd(0.5, 0.5 - half, 0.5)), Some(3));
        assert_eq!(table.find(&vcd(0.5 + 2.0 * XYZ_EPSILON, 0.5, 0.5)), None);
        assert_eq!(table.find(&vcd(0.5, 0.5, 0.5 - 2.0 * XYZ_EPSILON)), None);
    }

    #[test]
    fn test_match_across_cell_boundary() {
        let mut table = VertexCombinationTable::new();
        table.insert(vcd(0.0099, 0.0, 0.0), 1).unwrap();

        assert_eq!(table.find(&vcd(0.0101, 0.0, 0.0)), Some(1));
        assert_eq!(table.find(&vcd(-0.0001, 0.0, 0.0)), Some(1));
    }

    #[test]
    fn test_normal_uv_and_color_tolerances() {
        let mut table = VertexCombinationTable::new();
        let base = vcd(1.0, 1.0, 1.0);
        table.insert(base, 5).unwrap();

        let mut n = base;
        n.normal = Vec3::new(0.01, 0.0, 1.0);
        assert_eq!(table.find(&n), Some(5));
        n.normal = Vec3::new(0.05, 0.0, 1.0);
        assert_eq!(table.find(&n), None);

        let mut t = base;
        t.st.x += 0.00005;
        assert_eq!(table.find(&t), Some(5));
        t.st.x += 0.001;
        assert_eq!(table.find(&t), None);

        let mut c = base;
        c.color = [255, 255, 255, 254];
        assert_eq!(table.find(&c), None);
    }

    #[test]
    fn test_exact_policy() {
        let mut table = VertexCombinationTable::with_policy(HashPolicy::Exact);
        table.insert(vcd(1.0, 1.0, 1.0), 0).unwrap();

        assert_eq!(table.find(&vcd(1.0, 1.0, 1.0)), Some(0));
        assert_eq!(table.find(&vcd(1.0001, 1.0, 1.0)), None);
    }

    #[test]
    fn test_distinct_count_over_stream() {
        let mut table = VertexCombinationTable::new();
        let stream = [
            vcd(0.0, 0.0, 0.0),
            vcd(1.0, 0.0, 0.0),
            vcd(0.0, 1.0, 0.0),
            vcd(1.0, 0.0, 0.0),
            vcd(0.0, 1.0, 0.0),
            vcd(1.0, 1.0, 0.0),
            vcd(0.0, 0.002, 0.0),
        ];

        let mut next = 0;
        let mut resolved = Vec::new();
        for v in &stream {
            let (index, inserted) = table.find_or_insert(*v, next).unwrap();
            if inserted {
                next += 1;
            }
            resolved.push(index);
        }

        assert_eq!(next, 4);
        assert_eq!(resolved, vec![0, 1, 2, 1, 2, 3, 0]);
    }

    #[test]
    fn test_colliding_entries_chain() {
        let mut table = VertexCombinationTable::new();
        let mut count = 0;
        for i in 0..20_000u32 {
            let x = i as f32 * 0.5;
            table.insert(vcd(x, 0.0, 0.0), i).unwrap();
            count += 1;
        }

        assert_eq!(table.len(), count);
        for i in (0..20_000u32).step_by(997) {
            assert_eq!(table.find(&vcd(i as f32 * 0.5, 0.0, 0.0)), Some(i));
        }
    }
}
