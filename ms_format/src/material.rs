use serde::{Deserialize, Serialize};

/// Illumination model of a Wavefront material (`illum 0` to `illum 10`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Illumination {
    ColorOnAmbientOff,
    ColorOnAmbientOn,
    HighlightOn,
    ReflectionOnRayTraceOn,
    TransparencyGlassOnReflectionRayTraceOn,
    ReflectionFresnelOnRayTraceOn,
    TransparencyRefractionOnReflectionFresnelOffRayTraceOn,
    TransparencyRefractionOnReflectionFresnelOnRayTraceOn,
    ReflectionOnRayTraceOff,
    TransparencyGlassOnReflectionRayTraceOff,
    CastsShadowsOntoInvisibleSurfaces,
}

impl Illumination {
    pub const ALL: [Illumination; 11] = [
        Illumination::ColorOnAmbientOff,
        Illumination::ColorOnAmbientOn,
        Illumination::HighlightOn,
        Illumination::ReflectionOnRayTraceOn,
        Illumination::TransparencyGlassOnReflectionRayTraceOn,
        Illumination::ReflectionFresnelOnRayTraceOn,
        Illumination::TransparencyRefractionOnReflectionFresnelOffRayTraceOn,
        Illumination::TransparencyRefractionOnReflectionFresnelOnRayTraceOn,
        Illumination::ReflectionOnRayTraceOff,
        Illumination::TransparencyGlassOnReflectionRayTraceOff,
        Illumination::CastsShadowsOntoInvisibleSurfaces,
    ];

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

/// A texture map referenced by a material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub id: u32,
    pub file_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Cleared when texture validation rejects the file.
    pub valid: bool,
}

impl Texture {
    pub fn new(id: u32, file_name: impl Into<String>) -> Self {
        Texture {
            id,
            file_name: file_name.into(),
            width: None,
            height: None,
            valid: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: u32,
    pub name: Option<String>,
    pub ambient_color: Option<[u8; 3]>,
    pub diffuse_color: Option<[u8; 3]>,
    pub specular_color: Option<[u8; 3]>,
    pub specular_coefficient: Option<f32>,
    pub illumination: Option<Illumination>,
    pub transparency: Option<f32>,
    pub ambient_texture_map: Option<Texture>,
    pub diffuse_texture_map: Option<Texture>,
    pub specular_texture_map: Option<Texture>,
    pub alpha_texture_map: Option<Texture>,
    pub bump_texture_map: Option<Texture>,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Material {
            name: Some(name.into()),
            ..Material::default()
        }
    }

    /// All texture maps present on this material.
    pub fn texture_maps_mut(&mut self) -> impl Iterator<Item = &mut Texture> {
        [
            self.ambient_texture_map.as_mut(),
            self.diffuse_texture_map.as_mut(),
            self.specular_texture_map.as_mut(),
            self.alpha_texture_map.as_mut(),
            self.bump_texture_map.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}
