//! Wavefront material libraries (`.mtl`), read into the shaders of a model.

use glam::Vec3;
use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_till1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{eof, map, opt, rest};
use nom::number::complete::float;
use nom::sequence::{preceded, terminated, tuple};
use nom::IResult;

use crate::error::{Error, Result};
use crate::model::{Model, ShaderId};
use crate::shader::Color;

#[derive(Debug, Clone, PartialEq)]
enum Statement<'a> {
    NewMaterial(Option<&'a str>),
    Ambient(Vec3),
    Diffuse(Vec3),
    Specular(Vec3),
    DiffuseMap(&'a str),
    Dissolve(f32),
    Transparency(f32),
    SpecularExponent(f32),
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(kw), alt((space1, eof)))
}

fn line_end(input: &str) -> IResult<&str, &str> {
    preceded(space0, alt((preceded(char('#'), rest), rest)))(input)
}

fn color(input: &str) -> IResult<&str, Vec3> {
    map(
        tuple((float, preceded(space1, float), preceded(space1, float))),
        |(r, g, b)| Vec3::new(r, g, b),
    )(input)
}

fn new_material(input: &str) -> IResult<&str, Statement<'_>> {
    map(
        terminated(
            preceded(keyword("newmtl"), opt(take_till1(|c: char| c.is_whitespace()))),
            line_end,
        ),
        Statement::NewMaterial,
    )(input)
}

/// Option flags such as `-s 1 1 1` before the file name are kept as part of
/// the map name.
fn diffuse_map(input: &str) -> IResult<&str, Statement<'_>> {
    map(preceded(keyword("map_Kd"), map(rest, str::trim)), Statement::DiffuseMap)(input)
}

fn scalar<'a>(
    kw: &'static str,
    f: fn(f32) -> Statement<'a>,
) -> impl FnMut(&'a str) -> IResult<&'a str, Statement<'a>> {
    map(terminated(preceded(keyword(kw), float), line_end), f)
}

fn rgb<'a>(
    kw: &'static str,
    f: fn(Vec3) -> Statement<'a>,
) -> impl FnMut(&'a str) -> IResult<&'a str, Statement<'a>> {
    map(terminated(preceded(keyword(kw), color), line_end), f)
}

fn statement(input: &str) -> IResult<&str, Statement<'_>> {
    alt((
        new_material,
        rgb("Ka", Statement::Ambient),
        rgb("Kd", Statement::Diffuse),
        rgb("Ks", Statement::Specular),
        diffuse_map,
        scalar("d", Statement::Dissolve),
        scalar("Tr", Statement::Transparency),
        scalar("Ns", Statement::SpecularExponent),
    ))(input)
}

/// Exporters disagree on the range of `Ns`; the magnitude decides which
/// scale the value is taken to be on before it maps to 0..128.
fn guess_shininess(ns: f32) -> f32 {
    let ns = ns.max(0.0);
    if ns > 1000.0 {
        128.0 * ns / 2048.0
    } else if ns > 200.0 {
        128.0 * ns / 1000.0
    } else if ns > 100.0 {
        128.0 * ns / 200.0
    } else if ns > 1.0 {
        128.0 * ns / 100.0
    } else {
        ns * 128.0
    }
}

fn to_color(v: Vec3) -> Color {
    let c = v * 255.0;
    [c.x as u8, c.y as u8, c.z as u8, 255]
}

/// Adds every material of `text` to `model` as a shader.
///
/// Properties given before the first `newmtl` are an error, as is a
/// `newmtl` without a name. Shaders created before the error are kept.
pub fn parse_mtl(model: &mut Model, text: &str) -> Result<()> {
    let mut current: Option<ShaderId> = None;

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let statement = match statement(line) {
            Ok((_, statement)) => statement,
            Err(_) => continue,
        };

        if let Statement::NewMaterial(name) = statement {
            let name = name.ok_or_else(|| Error::parse(line_no, "missing material name"))?;
            let id = model.new_shader()?;
            if let Some(shader) = model.shader_mut(id) {
                shader.set_name(name);
            }
            current = Some(id);
            continue;
        }

        let shader = current
            .and_then(|id| model.shader_mut(id))
            .ok_or_else(|| Error::parse(line_no, "material property outside of newmtl"))?;
        match statement {
            Statement::Ambient(v) => shader.set_ambient_color(to_color(v)),
            Statement::Diffuse(v) => {
                let alpha = shader.diffuse_color()[3];
                let mut c = to_color(v);
                c[3] = alpha;
                shader.set_diffuse_color(c);
            }
            Statement::Specular(v) => shader.set_specular_color(to_color(v)),
            Statement::DiffuseMap(map) => shader.set_map_name(map),
            Statement::Dissolve(d) => {
                shader.set_transparency(1.0 - d);
                let mut c = shader.diffuse_color();
                c[3] = (d.max(0.0).min(1.0) * 255.0) as u8;
                shader.set_diffuse_color(c);
            }
            Statement::Transparency(tr) => {
                shader.set_transparency(tr);
                let mut c = shader.diffuse_color();
                c[3] = ((1.0 - tr).max(0.0).min(1.0) * 255.0) as u8;
                shader.set_diffuse_color(c);
            }
            Statement::SpecularExponent(ns) => shader.set_shininess(guess_shininess(ns)),
            Statement::NewMaterial(_) => {}
        }
    }
    Ok(())
}
