use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::{LoaderError, Result};
use crate::utils;

/// Smallest accepted chunk capacity: one triangle.
pub const MIN_MAX_VERTICES_IN_CHUNK: usize = 3;
pub const DEFAULT_MAX_VERTICES_IN_CHUNK: usize = 0xffff;
pub const MIN_STREAM_POSITIONS: usize = 1;
pub const DEFAULT_MAX_STREAM_POSITIONS: usize = 1_000_000;

/// Attributes two vertices must share to be merged when duplicates are
/// disallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VertexKey {
    Position,
    /// Position, normal, texture coordinate and color.
    Full,
}

impl Default for VertexKey {
    fn default() -> Self {
        VertexKey::Full
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub max_vertices_in_chunk: usize,
    pub allow_duplicate_vertices_in_chunk: bool,
    pub max_stream_positions: usize,
    pub continue_if_triangulation_error: bool,
    pub vertex_key: VertexKey,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            max_vertices_in_chunk: DEFAULT_MAX_VERTICES_IN_CHUNK,
            allow_duplicate_vertices_in_chunk: false,
            max_stream_positions: DEFAULT_MAX_STREAM_POSITIONS,
            continue_if_triangulation_error: false,
            vertex_key: VertexKey::default(),
        }
    }
}

impl LoaderConfig {
    pub fn validate(&self) -> Result<()> {
        check_max_vertices_in_chunk(self.max_vertices_in_chunk)?;
        check_max_stream_positions(self.max_stream_positions)
    }

    pub fn from_toml_str(value: &str) -> Result<Self> {
        let config: Self = toml::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        let config: Self = toml::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Config for the mesh at `path`: `<stem>.toml` next to the mesh, else a
    /// folder scoped `<extension>.toml` (e.g. `ply.toml`), else the defaults.
    pub fn discover(path: &Path) -> Result<Self> {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));

        let own = utils::combine_path(dir, utils::file_name(path)?, "toml");
        if own.is_file() {
            debug!("Using loader config {}", own.display());
            return LoaderConfig::parse(&own);
        }

        if let Some(extension) = utils::extension(path) {
            let scoped = utils::combine_path(dir, &extension, "toml");
            if scoped.is_file() {
                debug!("Using folder scoped loader config {}", scoped.display());
                return LoaderConfig::parse(&scoped);
            }
        }

        Ok(LoaderConfig::default())
    }
}

pub(crate) fn check_max_vertices_in_chunk(value: usize) -> Result<()> {
    if value < MIN_MAX_VERTICES_IN_CHUNK {
        return Err(LoaderError::InvalidArgument(format!(
            "max vertices in chunk must be at least {}, got {}",
            MIN_MAX_VERTICES_IN_CHUNK, value
        )));
    }
    Ok(())
}

pub(crate) fn check_max_stream_positions(value: usize) -> Result<()> {
    if value < MIN_STREAM_POSITIONS {
        return Err(LoaderError::InvalidArgument(format!(
            "max stream positions must be at least {}, got {}",
            MIN_STREAM_POSITIONS, value
        )));
    }
    Ok(())
}
