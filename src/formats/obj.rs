//! Wavefront `.obj` meshes.
//!
//! Each line is parsed into a [`Statement`] first; geometry is then
//! assembled group by group. Every group becomes one surface and its
//! vertexes are merged through a [`VertexCombinationTable`], so the per-face
//! index triplets of the file collapse into a shared vertex buffer.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_till1};
use nom::character::complete::{char, digit1, space0, space1};
use nom::combinator::{eof, map, map_res, opt, recognize, rest, value};
use nom::multi::separated_list1;
use nom::number::complete::float;
use nom::sequence::{pair, preceded, terminated, tuple};
use nom::IResult;

use crate::error::{Error, Result};
use crate::formats::mtl::parse_mtl;
use crate::host::PrintLevel;
use crate::model::{Model, SurfaceId};
use crate::module::{FormatModule, LoadContext, ModuleInfo};
use crate::path::{directory, set_extension};
use crate::shader::WHITE;
use crate::surface::SurfaceType;
use crate::tokenizer::Tokenizer;
use crate::vertex_hash::{VertexCombination, VertexCombinationTable};

static INFO: ModuleInfo = ModuleInfo {
    version: "0.6-b",
    display_name: "Wavefront ASCII",
    author: "seaw0lf",
    copyright: "2002 seaw0lf",
    default_extensions: &["obj"],
};

/// Lines the probe scans for keywords when the name does not give it away.
const PROBE_LINES: usize = 80;

/// Statements that are errors, not unknown lines, when they fail to parse.
const KEYWORDS: &[&str] = &["v", "vt", "vn", "f", "g", "o", "s", "usemtl", "mtllib"];

#[derive(Debug, Clone, Copy, PartialEq)]
struct FaceIndex {
    v: i32,
    vt: Option<i32>,
    vn: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
enum Statement<'a> {
    Vertex(Vec3),
    TexCoord(Vec2),
    Normal(Vec3),
    Face(Vec<FaceIndex>),
    Group(&'a str),
    Object(&'a str),
    UseMtl(&'a str),
    MtlLib(&'a str),
    Smooth(i32),
}

/*
    Basic Parsers
*/

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), alt((space1, eof)))
}

fn name(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), rest)(input)
}

/// Trailing extras (`v x y z w`, exporter vertex colors, comments) are ignored.
fn line_end(input: &str) -> IResult<&str, &str> {
    preceded(space0, alt((comment, rest)))(input)
}

fn integer(input: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse::<i32>)(input)
}

fn vec3(input: &str) -> IResult<&str, Vec3> {
    map(
        tuple((float, preceded(space1, float), preceded(space1, float))),
        |(x, y, z)| Vec3::new(x, y, z),
    )(input)
}

/*
    Statements
*/

fn vertex(input: &str) -> IResult<&str, Statement<'_>> {
    map(terminated(preceded(keyword("v"), vec3), line_end), Statement::Vertex)(input)
}

fn texture_coordinates(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        terminated(
            preceded(keyword("vt"), pair(float, preceded(space1, float))),
            line_end,
        ),
        |(u, v)| Statement::TexCoord(Vec2::new(u, v)),
    )(input)
}

fn vertex_normal(input: &str) -> IResult<&str, Statement<'_>> {
    map(terminated(preceded(keyword("vn"), vec3), line_end), Statement::Normal)(input)
}

/// `v`, `v/vt`, `v//vn` or `v/vt/vn`.
fn face_index(input: &str) -> IResult<&str, FaceIndex> {
    let (input, v) = integer(input)?;
    let (input, vt) = opt(preceded(char('/'), opt(integer)))(input)?;
    let (input, vn) = match vt {
        Some(_) => opt(preceded(char('/'), integer))(input)?,
        None => (input, None),
    };
    Ok((
        input,
        FaceIndex {
            v,
            vt: vt.flatten(),
            vn,
        },
    ))
}

fn face(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        terminated(
            preceded(keyword("f"), separated_list1(space1, face_index)),
            line_end,
        ),
        Statement::Face,
    )(input)
}

/// A group without a name is called `default`.
fn group(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        terminated(preceded(keyword("g"), opt(name)), line_end),
        |n| Statement::Group(n.unwrap_or("default")),
    )(input)
}

fn object_name(input: &str) -> IResult<&str, Statement<'_>> {
    map(terminated(preceded(keyword("o"), name), line_end), Statement::Object)(input)
}

fn usemtl(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        terminated(preceded(keyword("usemtl"), opt(name)), line_end),
        |n| Statement::UseMtl(n.unwrap_or("")),
    )(input)
}

fn material_file(input: &str) -> IResult<&str, Statement<'_>> {
    map(preceded(keyword("mtllib"), map(rest, str::trim)), Statement::MtlLib)(input)
}

/// `s off` and `s 0` clear the smoothing group; `s on` is group 1.
fn smooth_shading(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        terminated(
            preceded(
                keyword("s"),
                alt((
                    value(0, tag_no_case("off")),
                    value(1, tag_no_case("on")),
                    integer,
                )),
            ),
            line_end,
        ),
        Statement::Smooth,
    )(input)
}

fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((
        vertex,
        texture_coordinates,
        vertex_normal,
        face,
        group,
        object_name,
        usemtl,
        material_file,
        smooth_shading,
    ))(input)
}

/// Parses every meaningful line, keeping its 1-based line number.
fn parse_statements(text: &str) -> Result<Vec<(usize, Statement<'_>)>> {
    let mut statements = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match statement(line) {
            Ok((_, s)) => statements.push((i + 1, s)),
            Err(_) => {
                let first = line.split_whitespace().next().unwrap_or("");
                if KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(first)) {
                    return Err(Error::parse(i + 1, format!("malformed '{}' statement", first)));
                }
            }
        }
    }
    Ok(statements)
}

/// Turns a 1-based or negative (relative) index into a 0-based one.
fn resolve(index: i32, len: usize, line: usize, what: &str) -> Result<usize> {
    let resolved = if index > 0 {
        index as i64 - 1
    } else if index < 0 {
        len as i64 + index as i64
    } else {
        return Err(Error::parse(line, "Invalid face format"));
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(Error::parse(line, format!("{} index out of range", what)));
    }
    Ok(resolved as usize)
}

/// Per-load assembly state.
struct ObjBuilder<'c, 'h> {
    ctx: &'c LoadContext<'h>,
    model: Model,
    positions: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    normals: Vec<Vec3>,
    current: Option<SurfaceId>,
    faces: usize,
    smoothing_group: i32,
    auto_groups: usize,
    tables: HashMap<i32, VertexCombinationTable>,
}

impl<'c, 'h> ObjBuilder<'c, 'h> {
    fn new(ctx: &'c LoadContext<'h>) -> Self {
        let mut model = Model::new();
        model.set_frame(ctx.frame);
        model.set_name(ctx.file_name);
        model.set_file_name(ctx.file_name);
        ObjBuilder {
            ctx,
            model,
            positions: Vec::new(),
            tex_coords: Vec::new(),
            normals: Vec::new(),
            current: None,
            faces: 0,
            smoothing_group: 0,
            auto_groups: 0,
            tables: HashMap::new(),
        }
    }

    /// Starts a surface that inherits the current surface's shader.
    fn new_surface(&mut self, name: &str) -> Result<SurfaceId> {
        let shader = self
            .current
            .and_then(|id| self.model.surface(id))
            .and_then(|s| s.shader());
        let id = self.model.new_surface()?;
        let surface = self.model.surface_mut(id).ok_or(Error::Invalid)?;
        surface.set_kind(SurfaceType::Triangles);
        surface.set_name(name);
        surface.set_shader(shader);

        self.current = Some(id);
        self.faces = 0;
        self.tables.clear();
        Ok(id)
    }

    fn auto_surface(&mut self, line: usize, reason: &str) -> Result<SurfaceId> {
        self.ctx.warn(&format!(
            "No group defined for {}, so creating an autoSurface in OBJ, line {}.",
            reason, line
        ));
        let name = format!("__autogroup_{}", self.auto_groups);
        self.auto_groups += 1;
        self.new_surface(&name)
    }

    fn group(&mut self, name: &str) -> Result<()> {
        match self.current {
            Some(id) if self.faces == 0 => {
                if let Some(surface) = self.model.surface_mut(id) {
                    surface.set_name(name);
                }
            }
            _ => {
                self.new_surface(name)?;
            }
        }
        Ok(())
    }

    fn use_material(&mut self, line: usize, name: &str) -> Result<()> {
        let id = match self.current {
            Some(id) if self.faces == 0 => id,
            _ => self.auto_surface(line, "usemtl")?,
        };
        if name.is_empty() {
            self.ctx.print(
                PrintLevel::Error,
                &format!("Missing material name in OBJ, line {}.", line),
            );
            return Ok(());
        }

        let shader = match self.model.find_shader(name, true) {
            Some(shader) => shader,
            None => {
                self.ctx.warn(&format!(
                    "Undefined material name in OBJ, line {}. Making a default shader.",
                    line
                ));
                let shader = self.model.new_shader()?;
                if let Some(s) = self.model.shader_mut(shader) {
                    s.set_name(name);
                    s.set_map_name(name);
                }
                shader
            }
        };
        if let Some(surface) = self.model.surface_mut(id) {
            surface.set_shader(Some(shader));
        }
        Ok(())
    }

    /// Finds or appends the surface vertex for one face corner.
    fn corner(&mut self, id: SurfaceId, line: usize, index: &FaceIndex) -> Result<u32> {
        let xyz = self.positions[resolve(index.v, self.positions.len(), line, "Vertex")?];
        let st = match index.vt {
            Some(vt) => {
                let uv = self.tex_coords[resolve(vt, self.tex_coords.len(), line, "UV coord")?];
                Vec2::new(uv.x, -uv.y)
            }
            None => Vec2::ZERO,
        };
        let normal = match index.vn {
            Some(vn) => self.normals[resolve(vn, self.normals.len(), line, "Normal")?],
            None => Vec3::ZERO,
        };

        let vcd = VertexCombination {
            xyz,
            normal,
            st,
            color: WHITE,
        };
        let next = self
            .model
            .surface(id)
            .map(|s| s.num_vertexes())
            .ok_or(Error::Invalid)?;
        let table = self
            .tables
            .entry(self.smoothing_group)
            .or_insert_with(VertexCombinationTable::new);
        let (vertex, inserted) = table.find_or_insert(vcd, next as u32)?;

        if inserted {
            let num = vertex as usize;
            self.model.set_surface_xyz(id, num, xyz)?;
            let surface = self.model.surface_mut(id).ok_or(Error::Invalid)?;
            surface.set_normal(num, normal)?;
            surface.set_st(0, num, st)?;
            surface.set_color(0, num, WHITE)?;
            surface.set_smoothing_group(num, self.smoothing_group)?;
        }
        Ok(vertex)
    }

    /// Fans the polygon out from its first corner. Triangles are stored with
    /// reversed winding.
    fn face(&mut self, line: usize, indexes: &[FaceIndex]) -> Result<()> {
        if indexes.len() < 3 {
            return Err(Error::parse(line, "Face parse error"));
        }
        let id = match self.current {
            Some(id) => id,
            None => self.auto_surface(line, "faces")?,
        };

        let mut corners = Vec::with_capacity(indexes.len());
        for index in indexes {
            corners.push(self.corner(id, line, index)?);
        }

        let surface = self.model.surface_mut(id).ok_or(Error::Invalid)?;
        for k in 1..corners.len() - 1 {
            let start = surface.num_indexes();
            surface.set_indices(start, &[corners[k + 1], corners[k], corners[0]])?;
            self.faces += 1;
        }
        Ok(())
    }

    fn apply(&mut self, line: usize, statement: &Statement<'_>) -> Result<()> {
        match statement {
            Statement::Vertex(v) => {
                self.positions.try_reserve(1)?;
                self.positions.push(*v);
            }
            Statement::TexCoord(vt) => {
                self.tex_coords.try_reserve(1)?;
                self.tex_coords.push(*vt);
            }
            Statement::Normal(vn) => {
                self.normals.try_reserve(1)?;
                self.normals.push(*vn);
            }
            Statement::Face(indexes) => self.face(line, indexes)?,
            Statement::Group(name) => self.group(name)?,
            Statement::Object(name) => self.model.set_name(name),
            Statement::UseMtl(name) => self.use_material(line, name)?,
            Statement::Smooth(group) => self.smoothing_group = *group,
            Statement::MtlLib(_) => {}
        }
        Ok(())
    }

    /// Loads the material libraries named by `mtllib`, or `<model>.mtl`
    /// when there are none. Missing or broken libraries are only logged.
    fn load_materials(&mut self, statements: &[(usize, Statement<'_>)]) {
        let file_name = self.ctx.file_name;
        if file_name.is_empty() {
            return;
        }
        let dir = directory(file_name);
        let mut libraries: Vec<String> = statements
            .iter()
            .filter_map(|(_, s)| match s {
                Statement::MtlLib(lib) if !lib.is_empty() => Some(format!("{}{}", dir, lib)),
                _ => None,
            })
            .collect();
        if libraries.is_empty() {
            libraries.push(set_extension(file_name, "mtl"));
        }

        for library in &libraries {
            let buffer = match self.ctx.load_companion(library) {
                Some(buffer) => buffer,
                None => continue,
            };
            if let Err(err) = parse_mtl(&mut self.model, &String::from_utf8_lossy(&buffer)) {
                self.ctx.print(
                    PrintLevel::Error,
                    &format!("{} in MTL {}", err, library),
                );
            }
            self.ctx.host.release_file(buffer);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ObjModule;

impl FormatModule for ObjModule {
    fn info(&self) -> &ModuleInfo {
        &INFO
    }

    fn can_load(&self, file_name: &str, buffer: &[u8]) -> Result<()> {
        if buffer.len() < 30 {
            return Err(Error::Size);
        }
        let lower = file_name.to_ascii_lowercase();
        if lower.contains(".obj") || lower.contains(".wf") {
            return Ok(());
        }

        let mut tokens = Tokenizer::new(buffer);
        while let Some(token) = tokens.next(true) {
            if tokens.line() > PROBE_LINES {
                break;
            }
            if token.is_empty() {
                continue;
            }
            if ["usemtl", "mtllib", "g", "v"]
                .iter()
                .any(|k| k.eq_ignore_ascii_case(&token))
            {
                return Ok(());
            }
            tokens.skip_rest();
        }
        Err(Error::Invalid)
    }

    fn load(&self, ctx: &LoadContext<'_>, buffer: &[u8]) -> Result<Model> {
        let text = String::from_utf8_lossy(buffer);
        let statements = parse_statements(&text).map_err(|err| {
            ctx.print(PrintLevel::Error, &format!("{} in OBJ {}", err, ctx.file_name));
            err
        })?;

        let mut builder = ObjBuilder::new(ctx);
        builder.load_materials(&statements);
        for (line, statement) in &statements {
            if let Err(err) = builder.apply(*line, statement) {
                ctx.print(PrintLevel::Error, &format!("{} in OBJ {}", err, ctx.file_name));
                return Err(err);
            }
        }
        Ok(builder.model)
    }
}
