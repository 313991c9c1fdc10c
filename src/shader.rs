/// An RGBA color with byte components.
pub type Color = [u8; 4];

pub const WHITE: Color = [255, 255, 255, 255];

/// Material of a surface: names, colors and the two clamped scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    name: String,
    map_name: String,
    ambient: Color,
    diffuse: Color,
    specular: Color,
    transparency: f32,
    shininess: f32,
}

impl Default for Shader {
    fn default() -> Self {
        Shader {
            name: String::new(),
            map_name: String::new(),
            ambient: [0, 0, 0, 0],
            diffuse: WHITE,
            specular: [0, 0, 0, 0],
            transparency: 0.0,
            shininess: 0.0,
        }
    }
}

impl Shader {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// File name of the diffuse texture map.
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn set_map_name(&mut self, map_name: &str) {
        self.map_name = map_name.to_string();
    }

    pub fn ambient_color(&self) -> Color {
        self.ambient
    }

    pub fn set_ambient_color(&mut self, color: Color) {
        self.ambient = color;
    }

    pub fn diffuse_color(&self) -> Color {
        self.diffuse
    }

    pub fn set_diffuse_color(&mut self, color: Color) {
        self.diffuse = color;
    }

    pub fn specular_color(&self) -> Color {
        self.specular
    }

    pub fn set_specular_color(&mut self, color: Color) {
        self.specular = color;
    }

    /// 0 is opaque, 1 fully transparent.
    pub fn transparency(&self) -> f32 {
        self.transparency
    }

    pub fn set_transparency(&mut self, value: f32) {
        self.transparency = value.max(0.0).min(1.0);
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn set_shininess(&mut self, value: f32) {
        self.shininess = value.max(0.0).min(127.0);
    }
}
