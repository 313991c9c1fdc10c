//! Quake III Arena `.md3` meshes.
//!
//! Every record offset and count read from the file is checked against the
//! buffer before the record is parsed; anything pointing outside the buffer
//! is a size error.

use std::convert::TryFrom;
use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use nom::bytes::complete::take;
use nom::combinator::map;
use nom::multi::count;
use nom::number::complete::{le_f32, le_i16, le_i32};
use nom::sequence::tuple;
use nom::IResult;

use crate::error::{Error, Result};
use crate::host::PrintLevel;
use crate::model::Model;
use crate::module::{FormatModule, LoadContext, ModuleInfo};
use crate::path::{set_extension, unixify};
use crate::shader::WHITE;
use crate::surface::SurfaceType;

const MAGIC: &[u8; 4] = b"IDP3";
const VERSION: i32 = 15;
const SCALE: f32 = 1.0 / 64.0;

const HEADER_SIZE: usize = 108;
const SHADER_SIZE: usize = 68;
const TRIANGLE_SIZE: usize = 12;
const TEXCOORD_SIZE: usize = 8;
const VERTEX_SIZE: usize = 8;

static INFO: ModuleInfo = ModuleInfo {
    version: "1.3",
    display_name: "Quake 3 Arena",
    author: "Randy Reddig",
    copyright: "2002 Randy Reddig",
    default_extensions: &["md3"],
};

/// 64-byte NUL-padded name field.
fn name64(data: &[u8]) -> IResult<&[u8], String> {
    let (data, raw) = take(64usize)(data)?;
    let end = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
    Ok((data, String::from_utf8_lossy(&raw[..end]).into_owned()))
}

#[derive(Debug)]
struct Header {
    magic: [u8; 4],
    version: i32,
    name: String,
    num_frames: i32,
    num_surfaces: i32,
    ofs_surfaces: i32,
}

impl Header {
    fn parse(data: &[u8]) -> IResult<&[u8], Self> {
        let (data, (magic, version, name)) = tuple((take(4usize), le_i32, name64))(data)?;
        let (data, (_flags, num_frames, _num_tags, num_surfaces, _num_skins)) =
            tuple((le_i32, le_i32, le_i32, le_i32, le_i32))(data)?;
        let (data, (_ofs_frames, _ofs_tags, ofs_surfaces, _ofs_end)) =
            tuple((le_i32, le_i32, le_i32, le_i32))(data)?;

        let mut m = [0; 4];
        m.copy_from_slice(magic);
        Ok((
            data,
            Header {
                magic: m,
                version,
                name,
                num_frames,
                num_surfaces,
                ofs_surfaces,
            },
        ))
    }
}

/// Per-surface header. Offsets are relative to the surface start.
#[derive(Debug)]
struct SurfaceHeader {
    name: String,
    num_frames: i32,
    num_shaders: i32,
    num_verts: i32,
    num_triangles: i32,
    ofs_triangles: i32,
    ofs_shaders: i32,
    ofs_st: i32,
    ofs_vertexes: i32,
    ofs_end: i32,
}

impl SurfaceHeader {
    fn parse(data: &[u8]) -> IResult<&[u8], Self> {
        let (data, (_magic, name, _flags)) = tuple((take(4usize), name64, le_i32))(data)?;
        let (data, (num_frames, num_shaders, num_verts, num_triangles)) =
            tuple((le_i32, le_i32, le_i32, le_i32))(data)?;
        let (data, (ofs_triangles, ofs_shaders, ofs_st, ofs_vertexes, ofs_end)) =
            tuple((le_i32, le_i32, le_i32, le_i32, le_i32))(data)?;
        Ok((
            data,
            SurfaceHeader {
                name,
                num_frames,
                num_shaders,
                num_verts,
                num_triangles,
                ofs_triangles,
                ofs_shaders,
                ofs_st,
                ofs_vertexes,
                ofs_end,
            },
        ))
    }
}

fn shader_name(data: &[u8]) -> IResult<&[u8], String> {
    let (data, (name, _index)) = tuple((name64, le_i32))(data)?;
    Ok((data, name))
}

fn triangle(data: &[u8]) -> IResult<&[u8], [u32; 3]> {
    map(tuple((le_i32, le_i32, le_i32)), |(a, b, c)| {
        [a as u32, b as u32, c as u32]
    })(data)
}

fn tex_coord(data: &[u8]) -> IResult<&[u8], Vec2> {
    map(tuple((le_f32, le_f32)), |(s, t)| Vec2::new(s, t))(data)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Vertex {
    xyz: Vec3,
    normal: Vec3,
}

fn vertex(data: &[u8]) -> IResult<&[u8], Vertex> {
    map(tuple((le_i16, le_i16, le_i16, le_i16)), |(x, y, z, n)| Vertex {
        xyz: Vec3::new(x as f32, y as f32, z as f32) * SCALE,
        normal: decode_normal(n),
    })(data)
}

/// Unpacks a latitude/longitude byte pair into a unit vector.
fn decode_normal(packed: i16) -> Vec3 {
    let packed = i32::from(packed);
    let lat = ((packed >> 8) & 0xff) as f32 * PI / 128.0;
    let lng = (packed & 0xff) as f32 * PI / 128.0;
    Vec3::new(lat.cos() * lng.sin(), lat.sin() * lng.sin(), lng.cos())
}

fn to_count(value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::Invalid)
}

/// `count` records of `size` bytes at `offset` into `data`.
fn section(data: &[u8], offset: i32, count: usize, size: usize) -> Result<&[u8]> {
    let start = usize::try_from(offset).map_err(|_| Error::Size)?;
    let len = count.checked_mul(size).ok_or(Error::Size)?;
    let end = start.checked_add(len).ok_or(Error::Size)?;
    data.get(start..end).ok_or(Error::Size)
}

fn records<'a, O>(
    data: &'a [u8],
    n: usize,
    parser: fn(&'a [u8]) -> IResult<&'a [u8], O>,
) -> Result<Vec<O>> {
    count(parser, n)(data)
        .map(|(_, items)| items)
        .map_err(|_| Error::Size)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Md3Module;

impl Md3Module {
    fn load_surface(ctx: &LoadContext<'_>, model: &mut Model, data: &[u8]) -> Result<usize> {
        let (_, header) = SurfaceHeader::parse(data).map_err(|_| Error::Size)?;
        let num_verts = to_count(header.num_verts)?;
        let num_triangles = to_count(header.num_triangles)?;
        if header.num_frames > 0 && ctx.frame >= header.num_frames as usize {
            ctx.warn(&format!(
                "MD3 surface {} has only {} frames",
                header.name, header.num_frames
            ));
        }

        let id = model.new_surface()?;
        let shader = model.new_shader()?;

        let name = if header.num_shaders > 0 {
            let raw = section(data, header.ofs_shaders, 1, SHADER_SIZE)?;
            let (_, name) = shader_name(raw).map_err(|_| Error::Size)?;
            unixify(&set_extension(&name, ""))
        } else {
            String::new()
        };
        if let Some(s) = model.shader_mut(shader) {
            s.set_name(&name);
        }

        let raw = section(data, header.ofs_triangles, num_triangles, TRIANGLE_SIZE)?;
        let triangles = records(raw, num_triangles, triangle)?;
        let raw = section(data, header.ofs_st, num_verts, TEXCOORD_SIZE)?;
        let st = records(raw, num_verts, tex_coord)?;
        let frame_offset = num_verts
            .checked_mul(ctx.frame)
            .and_then(|n| n.checked_mul(VERTEX_SIZE))
            .and_then(|n| i32::try_from(n).ok())
            .and_then(|n| n.checked_add(header.ofs_vertexes))
            .ok_or(Error::Size)?;
        let raw = section(data, frame_offset, num_verts, VERTEX_SIZE)?;
        let vertexes = records(raw, num_verts, vertex)?;

        for (j, v) in vertexes.iter().enumerate() {
            model.set_surface_xyz(id, j, v.xyz)?;
        }
        let surface = model.surface_mut(id).ok_or(Error::Invalid)?;
        surface.set_kind(SurfaceType::Triangles);
        surface.set_name(&header.name);
        surface.set_shader(Some(shader));
        for (j, (v, st)) in vertexes.iter().zip(&st).enumerate() {
            surface.set_normal(j, v.normal)?;
            surface.set_st(0, j, *st)?;
            surface.set_color(0, j, WHITE)?;
        }
        let flat: Vec<u32> = triangles.iter().flatten().copied().collect();
        surface.set_indices(0, &flat)?;

        if header.ofs_end <= 0 {
            return Err(Error::Invalid);
        }
        Ok(header.ofs_end as usize)
    }
}

impl FormatModule for Md3Module {
    fn info(&self) -> &ModuleInfo {
        &INFO
    }

    fn can_load(&self, _file_name: &str, buffer: &[u8]) -> Result<()> {
        if buffer.len() < HEADER_SIZE * 2 {
            return Err(Error::Size);
        }
        if &buffer[..4] != MAGIC {
            return Err(Error::Ident);
        }
        let (_, version) = le_i32::<&[u8], nom::error::Error<&[u8]>>(&buffer[4..8])
            .map_err(|_| Error::Size)?;
        if version != VERSION {
            return Err(Error::Version(version));
        }
        Ok(())
    }

    fn load(&self, ctx: &LoadContext<'_>, buffer: &[u8]) -> Result<Model> {
        let (_, header) = Header::parse(buffer).map_err(|_| Error::Size)?;
        if &header.magic != MAGIC {
            return Err(Error::Ident);
        }
        if header.version != VERSION {
            return Err(Error::Version(header.version));
        }
        if header.num_frames < 1 {
            ctx.print(PrintLevel::Error, "MD3 with 0 frames");
            return Err(Error::Invalid);
        }
        let frames = header.num_frames as usize;
        if ctx.frame >= frames {
            ctx.print(PrintLevel::Error, "Invalid or out-of-range MD3 frame specified");
            return Err(Error::InvalidFrame {
                frame: ctx.frame,
                frames,
            });
        }
        log::debug!("md3 {}: {} surfaces", header.name, header.num_surfaces);

        let mut model = Model::new();
        model.set_frame(ctx.frame);
        model.set_num_frames(frames);
        model.set_name(ctx.file_name);
        model.set_file_name(ctx.file_name);

        let mut offset = usize::try_from(header.ofs_surfaces).map_err(|_| Error::Size)?;
        for _ in 0..to_count(header.num_surfaces)? {
            let data = buffer.get(offset..).ok_or(Error::Size)?;
            offset = offset
                .checked_add(Md3Module::load_surface(ctx, &mut model, data)?)
                .ok_or(Error::Size)?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    fn put_i32(out: &mut Vec<u8>, v: i32) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    fn put_str(out: &mut Vec<u8>, s: &str, len: usize) {
        let mut raw = s.as_bytes().to_vec();
        raw.resize(len, 0);
        out.extend_from_slice(&raw);
    }

    /// One-surface quad with `frames` animation frames; frame `f` is the
    /// base quad shifted by `f` units on X.
    fn build_md3(frames: i32) -> Vec<u8> {
        let frame_size = 56;
        let ofs_surfaces = HEADER_SIZE as i32 + frame_size * frames;
        let mut out = Vec::new();

        out.extend_from_slice(MAGIC);
        put_i32(&mut out, VERSION);
        put_str(&mut out, "models/box.md3", 64);
        for v in &[0, frames, 0, 1, 0, HEADER_SIZE as i32, ofs_surfaces, ofs_surfaces, 0] {
            put_i32(&mut out, *v);
        }
        out.resize(ofs_surfaces as usize, 0);

        let ofs_shaders = 108;
        let ofs_triangles = ofs_shaders + SHADER_SIZE as i32;
        let ofs_st = ofs_triangles + 2 * TRIANGLE_SIZE as i32;
        let ofs_vertexes = ofs_st + 4 * TEXCOORD_SIZE as i32;
        let ofs_end = ofs_vertexes + 4 * frames * VERTEX_SIZE as i32;

        out.extend_from_slice(MAGIC);
        put_str(&mut out, "box", 64);
        for v in &[0, frames, 1, 4, 2, ofs_triangles, ofs_shaders, ofs_st, ofs_vertexes, ofs_end] {
            put_i32(&mut out, *v);
        }
        put_str(&mut out, "textures\\base\\crate.tga", 64);
        put_i32(&mut out, 0);
        for i in &[0, 1, 2, 0, 2, 3] {
            put_i32(&mut out, *i);
        }
        for (s, t) in &[(0.0f32, 0.0f32), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            out.extend_from_slice(&s.to_le_bytes());
            out.extend_from_slice(&t.to_le_bytes());
        }
        for f in 0..frames as i16 {
            for (x, y) in &[(0i16, 0i16), (64, 0), (64, 64), (0, 64)] {
                for c in &[x + f * 64, *y, 0, 0] {
                    out.extend_from_slice(&c.to_le_bytes());
                }
            }
        }
        out
    }

    fn load(buffer: &[u8], frame: usize) -> Result<Model> {
        let host = MemoryHost::new();
        let ctx = LoadContext::new(&host, "models/box.md3", frame);
        Md3Module.load(&ctx, buffer)
    }

    #[test]
    fn test_header() {
        let buffer = build_md3(1);
        let (rest, header) = Header::parse(&buffer).unwrap();

        assert_eq!(buffer.len() - rest.len(), HEADER_SIZE);
        assert_eq!(&header.magic, MAGIC);
        assert_eq!(header.version, 15);
        assert_eq!(header.name, "models/box.md3");
        assert_eq!(header.num_surfaces, 1);
    }

    #[test]
    fn test_vertex() {
        let raw = [64u8, 0, 128, 255, 32, 0, 0, 0];
        let (rest, v) = vertex(&raw).unwrap();

        assert!(rest.is_empty());
        assert_eq!(v.xyz, Vec3::new(1.0, -2.0, 0.5));
        assert!((v.normal - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_decode_normal() {
        assert!((decode_normal(64) - Vec3::X).length() < 1e-6);
        assert!((decode_normal((64 << 8) | 64) - Vec3::Y).length() < 1e-6);
        assert!((decode_normal(128) - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_can_load() {
        let buffer = build_md3(1);
        assert!(Md3Module.can_load("x.md3", &buffer).is_ok());
        assert!(matches!(Md3Module.can_load("x.md3", &buffer[..200]), Err(Error::Size)));

        let mut bad = buffer.clone();
        bad[0] = b'X';
        assert!(matches!(Md3Module.can_load("x.md3", &bad), Err(Error::Ident)));

        let mut old = buffer;
        old[4] = 14;
        assert!(matches!(Md3Module.can_load("x.md3", &old), Err(Error::Version(14))));
    }

    #[test]
    fn test_load() {
        let model = load(&build_md3(1), 0).unwrap();

        assert_eq!(model.num_surfaces(), 1);
        assert_eq!(model.num_shaders(), 1);
        assert_eq!(model.num_frames(), 1);
        assert_eq!(model.file_name(), "models/box.md3");

        let (_, surface) = model.surfaces().next().unwrap();
        assert_eq!(surface.name(), "box");
        assert_eq!(surface.kind(), SurfaceType::Triangles);
        assert_eq!(surface.num_vertexes(), 4);
        assert_eq!(surface.indexes(), &[0, 1, 2, 0, 2, 3]);
        assert_eq!(surface.xyz(2), Some(Vec3::new(1.0, 1.0, 0.0)));
        assert_eq!(surface.st(0, 1), Some(Vec2::new(1.0, 0.0)));
        assert_eq!(surface.color(0, 3), Some(WHITE));

        let shader = model.shader(surface.shader().unwrap()).unwrap();
        assert_eq!(shader.name(), "textures/base/crate");
        assert_eq!(model.bounds(), (Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_frame_selection() {
        let buffer = build_md3(3);
        let model = load(&buffer, 2).unwrap();
        let (_, surface) = model.surfaces().next().unwrap();

        assert_eq!(model.frame(), 2);
        assert_eq!(model.num_frames(), 3);
        assert_eq!(surface.xyz(0), Some(Vec3::new(2.0, 0.0, 0.0)));

        assert!(matches!(
            load(&buffer, 3),
            Err(Error::InvalidFrame { frame: 3, frames: 3 })
        ));
    }

    #[test]
    fn test_truncated_buffer() {
        let buffer = build_md3(1);
        assert!(matches!(load(&buffer[..buffer.len() - 4], 0), Err(Error::Size)));
        assert!(matches!(load(&buffer[..50], 0), Err(Error::Size)));
    }

    #[test]
    fn test_lying_counts() {
        let mut buffer = build_md3(1);
        let surface = 108 + 56;
        // numVerts
        buffer[surface + 80..surface + 84].copy_from_slice(&1_000_000i32.to_le_bytes());
        assert!(matches!(load(&buffer, 0), Err(Error::Size)));

        buffer[surface + 80..surface + 84].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(load(&buffer, 0), Err(Error::Invalid)));
    }
}
