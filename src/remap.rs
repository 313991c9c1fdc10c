//! Material remapping scripts.
//!
//! A `<model>.remap` file next to a model can rename shaders in bulk
//!
//! ```text
//! materials {
//!     "old_name" => "new_name"
//! }
//! ```
//!
//! or override single fields of one material
//!
//! ```text
//! materials[ "old_name" ] {
//!     shader "textures/new"
//!     mapname "textures/new.tga"
//!     diffuse 255 128 0
//! }
//! ```

use crate::error::{Error, Result};
use crate::host::Host;
use crate::model::{Model, ShaderId};
use crate::shader::Color;
use crate::tokenizer::Tokenizer;

const BLOCK: &str = "materials";
const SINGLE: &str = "materials[";

/// Applies the remap file `remap_file` to `model`.
///
/// An empty file is a successful no-op. A file the host cannot load and a
/// syntax error are both errors; edits made before a syntax error stay.
pub fn remap_model<H: Host + ?Sized>(model: &mut Model, host: &H, remap_file: &str) -> Result<()> {
    let buffer = host
        .load_file(remap_file)
        .map_err(|_| Error::FileLoad(remap_file.to_string()))?;
    let result = if buffer.is_empty() {
        Ok(())
    } else {
        apply_remap(model, &buffer)
    };
    host.release_file(buffer);
    result
}

/// Applies remap script text to `model`.
pub fn apply_remap(model: &mut Model, script: &[u8]) -> Result<()> {
    let mut tokens = Tokenizer::new(script);

    while let Some(token) = tokens.next(true) {
        if token == "//" {
            tokens.skip_rest();
        } else if token.eq_ignore_ascii_case(BLOCK) {
            rename_block(model, &mut tokens)?;
        } else if starts_with_ignore_case(&token, SINGLE) {
            material_block(model, &mut tokens, &token[SINGLE.len()..])?;
        }
    }
    Ok(())
}

fn starts_with_ignore_case(token: &str, prefix: &str) -> bool {
    token.len() >= prefix.len()
        && token.is_char_boundary(prefix.len())
        && token[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn syntax(tokens: &Tokenizer<'_>, message: &str) -> Error {
    Error::parse(tokens.line(), message)
}

fn rename_block(model: &mut Model, tokens: &mut Tokenizer<'_>) -> Result<()> {
    if !tokens.check(true, "{") {
        return Err(syntax(tokens, "expected '{' after materials"));
    }

    let mut level = 1;
    while let Some(material) = tokens.next(true) {
        if material.is_empty() {
            continue;
        }
        if material.starts_with('{') {
            level += 1;
        }
        if material.starts_with('}') {
            level -= 1;
        }
        if level == 0 {
            break;
        }

        let mut target = tokens
            .next(false)
            .ok_or_else(|| syntax(tokens, "missing new material name"))?;
        if target == "=>" || target == "->" || target == "=" {
            target = tokens
                .next(false)
                .ok_or_else(|| syntax(tokens, "missing new material name"))?;
        }

        if let Some(id) = model.find_shader(&material, false) {
            rename(model, id, &target);
        }
        tokens.skip_rest();
    }
    Ok(())
}

fn rename(model: &mut Model, id: ShaderId, name: &str) {
    if let Some(shader) = model.shader_mut(id) {
        log::debug!("remapping material {} to {}", shader.name(), name);
        shader.set_name(name);
    }
}

/// Handles `materials[ "name" ] { ... }`; `inline` is whatever followed the
/// bracket within the same token, as in `materials["name"]`.
fn material_block(model: &mut Model, tokens: &mut Tokenizer<'_>, inline: &str) -> Result<()> {
    let name = if inline.is_empty() {
        let name = tokens
            .next(false)
            .ok_or_else(|| syntax(tokens, "missing material name"))?;
        if !tokens.check(false, "]") {
            return Err(syntax(tokens, "expected ']'"));
        }
        name
    } else {
        let inner = inline
            .strip_suffix(']')
            .ok_or_else(|| syntax(tokens, "expected ']'"))?;
        inner.trim_matches('"').to_string()
    };

    let id = match model.find_shader(&name, false) {
        Some(id) => id,
        None => {
            tokens.skip_braced();
            return Ok(());
        }
    };
    if !tokens.check(true, "{") {
        return Err(syntax(tokens, "expected '{' after material name"));
    }

    let mut level = 1;
    while let Some(key) = tokens.next(true) {
        if key.is_empty() {
            continue;
        }
        if key.starts_with('{') {
            level += 1;
        }
        if key.starts_with('}') {
            level -= 1;
        }
        if level == 0 {
            break;
        }

        match key.to_ascii_lowercase().as_str() {
            "shader" => {
                let value = tokens
                    .next(false)
                    .ok_or_else(|| syntax(tokens, "missing shader name"))?;
                rename(model, id, &value);
            }
            "mapname" => {
                let value = tokens
                    .next(false)
                    .ok_or_else(|| syntax(tokens, "missing map name"))?;
                if let Some(shader) = model.shader_mut(id) {
                    shader.set_map_name(&value);
                }
            }
            channel @ ("ambient" | "diffuse" | "specular") => {
                let v = tokens
                    .vec3()
                    .ok_or_else(|| syntax(tokens, "expected three color components"))?;
                if let Some(shader) = model.shader_mut(id) {
                    let base = match channel {
                        "ambient" => shader.ambient_color(),
                        "diffuse" => shader.diffuse_color(),
                        _ => shader.specular_color(),
                    };
                    let color: Color = [v.x as u8, v.y as u8, v.z as u8, base[3]];
                    match channel {
                        "ambient" => shader.set_ambient_color(color),
                        "diffuse" => shader.set_diffuse_color(color),
                        _ => shader.set_specular_color(color),
                    }
                }
            }
            _ => {}
        }
        tokens.skip_rest();
    }
    Ok(())
}
