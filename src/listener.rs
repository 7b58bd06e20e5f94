//! Callbacks a loader fires while it is locked.
//!
//! Every callback receives the loader itself; any mutating call made on it
//! from inside a callback fails with [`LoaderError::Locked`].
//!
//! [`LoaderError::Locked`]: crate::LoaderError::Locked

use ms_format::{Material, Texture};

use crate::loader::Loader;

/// Load lifecycle notifications.
pub trait LoaderListener {
    /// Fired once per [`Loader::load`] before the pre-scan.
    fn on_load_start(&mut self, _loader: &mut Loader) {}

    /// Fired once after the final chunk was produced.
    fn on_load_end(&mut self, _loader: &mut Loader) {}

    /// Fired after every chunk with a non-decreasing value in `[0, 1]`.
    fn on_load_progress_change(&mut self, _loader: &mut Loader, _progress: f32) {}
}

/// Failure of a [`MaterialLoader`].
#[derive(thiserror::Error, Debug)]
pub enum MaterialError {
    #[error("Material library not found: {0}")]
    NotFound(String),
    #[error("Invalid material library: {0}")]
    Invalid(String),
    /// Aborts the whole load.
    #[error("Material loading failed: {0}")]
    Fatal(String),
}

/// Produces the materials of one material library (e.g. a `.mtl` file).
pub trait MaterialLoader {
    fn load_materials(&mut self) -> Result<Vec<Material>, MaterialError>;
}

/// Resolves `mtllib` references of OBJ files.
pub trait MaterialListener {
    /// Returns a loader for the library at `path`, or `None` to skip it.
    fn on_material_loader_requested(&mut self, path: &str) -> Option<Box<dyn MaterialLoader>>;
}

/// Validates texture maps referenced by materials.
pub trait TextureListener {
    /// May rewrite `texture` (e.g. point it to a converted file). Returning
    /// `false` marks the texture invalid.
    fn on_validate_texture(&mut self, texture: &mut Texture) -> bool;
}

impl<F> MaterialLoader for F
where
    F: FnMut() -> Result<Vec<Material>, MaterialError>,
{
    fn load_materials(&mut self) -> Result<Vec<Material>, MaterialError> {
        self()
    }
}
