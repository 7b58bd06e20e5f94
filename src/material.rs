use std::collections::HashMap;

use log::{debug, warn};
use ms_format::Material;

use crate::error::{LoaderError, Result};
use crate::listener::{MaterialError, MaterialListener, TextureListener};

/// Materials loaded through `mtllib` references, with ids assigned in load
/// order and a name lookup for `usemtl`.
#[derive(Debug, Default)]
pub(crate) struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: HashMap<String, u32>,
    next_texture_id: u32,
}

impl MaterialLibrary {
    /// Asks the material listener for a loader of the library at `path` and
    /// adds its materials. Only [`MaterialError::Fatal`] fails the load.
    pub(crate) fn request(
        &mut self,
        path: &str,
        materials: Option<&mut Box<dyn MaterialListener>>,
        mut textures: Option<&mut Box<dyn TextureListener>>,
    ) -> Result<()> {
        let listener = match materials {
            Some(listener) => listener,
            None => {
                warn!("No material listener set, ignoring material library {}", path);
                return Ok(());
            }
        };

        let mut loader = match listener.on_material_loader_requested(path) {
            Some(loader) => loader,
            None => {
                warn!("No loader for material library {}", path);
                return Ok(());
            }
        };

        match loader.load_materials() {
            Ok(loaded) => {
                debug!("Loaded {} materials from {}", loaded.len(), path);
                for material in loaded {
                    self.add(material, textures.as_deref_mut());
                }
                Ok(())
            }
            Err(MaterialError::Fatal(details)) => Err(LoaderError::Material(details)),
            Err(err) => {
                warn!("Ignoring material library {}: {}", path, err);
                Ok(())
            }
        }
    }

    fn add(&mut self, mut material: Material, mut textures: Option<&mut Box<dyn TextureListener>>) {
        let id = self.materials.len() as u32;
        material.id = id;

        for texture in material.texture_maps_mut() {
            texture.id = self.next_texture_id;
            self.next_texture_id += 1;
            if let Some(listener) = textures.as_mut() {
                texture.valid = listener.on_validate_texture(texture);
                if !texture.valid {
                    warn!("Texture {} rejected", texture.file_name);
                }
            }
        }

        if let Some(name) = &material.name {
            self.by_name.insert(name.clone(), id);
        }
        self.materials.push(material);
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub(crate) fn materials(&self) -> &[Material] {
        &self.materials
    }
}
