use std::io::{self, Read, Seek};
use std::path::Path;

use log::{debug, info, warn};
use ms_format::{DataChunk, Material};

use crate::config::{self, LoaderConfig, VertexKey};
use crate::error::{LoaderError, Result};
use crate::listener::{LoaderListener, MaterialListener, TextureListener};
use crate::mesh::obj::ObjChunkReader;
use crate::mesh::ply::PlyChunkReader;
use crate::mesh::stl::StlChunkReader;
use crate::mesh::{self, ChunkReader, MeshFormat};
use crate::source::MeshSource;

/// Streaming mesh loader.
///
/// A loader without a source is not ready. Binding a source makes it ready,
/// [`Loader::load`] locks it until the returned [`LoaderIterator`] is exhausted
/// or dropped. While locked every mutating call fails with
/// [`LoaderError::Locked`].
pub struct Loader {
    config: LoaderConfig,
    source: Option<MeshSource>,
    format: Option<MeshFormat>,
    locked: bool,
    listener: Option<Box<dyn LoaderListener>>,
    material_listener: Option<Box<dyn MaterialListener>>,
    texture_listener: Option<Box<dyn TextureListener>>,
    comments: Vec<String>,
    materials: Vec<Material>,
}

impl Default for Loader {
    fn default() -> Self {
        Loader::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        Loader {
            config: LoaderConfig::default(),
            source: None,
            format: None,
            locked: false,
            listener: None,
            material_listener: None,
            texture_listener: None,
            comments: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn with_config(config: LoaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Loader {
            config,
            ..Loader::new()
        })
    }

    /// Opens the mesh at `path` with the config found next to it (see
    /// [`LoaderConfig::discover`]). The format comes from the extension, or
    /// from the content when the extension is unknown.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut loader = Loader::with_config(LoaderConfig::discover(path)?)?;
        loader.set_path(path)?;
        Ok(loader)
    }

    pub fn from_reader<R: Read + Seek + 'static>(reader: R, format: MeshFormat) -> Result<Self> {
        let mut loader = Loader::new();
        loader.set_reader(reader, format)?;
        Ok(loader)
    }

    fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            return Err(LoaderError::Locked);
        }
        Ok(())
    }

    pub fn set_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.check_unlocked()?;
        let path = path.as_ref();
        let mut source = MeshSource::open(path)?;

        let format = match MeshFormat::from_path(path) {
            Some(format) => format,
            None => MeshFormat::sniff(&mut source)?.ok_or_else(|| {
                LoaderError::InvalidArgument(format!("Unknown mesh format: {}", path.display()))
            })?,
        };

        debug!("Bound {:?} source {}", format, path.display());
        self.bind(source, format);
        Ok(())
    }

    pub fn set_reader<R: Read + Seek + 'static>(&mut self, reader: R, format: MeshFormat) -> Result<()> {
        self.check_unlocked()?;
        let source = MeshSource::new(Box::new(reader))?;
        self.bind(source, format);
        Ok(())
    }

    fn bind(&mut self, source: MeshSource, format: MeshFormat) {
        self.source = Some(source);
        self.format = Some(format);
        self.comments.clear();
        self.materials.clear();
    }

    pub fn format(&self) -> Option<MeshFormat> {
        self.format
    }

    pub fn path(&self) -> Option<&Path> {
        self.source.as_ref().and_then(|s| s.path())
    }

    pub fn is_ready(&self) -> bool {
        self.source.is_some() && !self.locked
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: LoaderConfig) -> Result<()> {
        self.check_unlocked()?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn max_vertices_in_chunk(&self) -> usize {
        self.config.max_vertices_in_chunk
    }

    pub fn set_max_vertices_in_chunk(&mut self, value: usize) -> Result<()> {
        self.check_unlocked()?;
        config::check_max_vertices_in_chunk(value)?;
        self.config.max_vertices_in_chunk = value;
        Ok(())
    }

    pub fn allow_duplicate_vertices_in_chunk(&self) -> bool {
        self.config.allow_duplicate_vertices_in_chunk
    }

    pub fn set_allow_duplicate_vertices_in_chunk(&mut self, value: bool) -> Result<()> {
        self.check_unlocked()?;
        self.config.allow_duplicate_vertices_in_chunk = value;
        Ok(())
    }

    pub fn max_stream_positions(&self) -> usize {
        self.config.max_stream_positions
    }

    pub fn set_max_stream_positions(&mut self, value: usize) -> Result<()> {
        self.check_unlocked()?;
        config::check_max_stream_positions(value)?;
        self.config.max_stream_positions = value;
        Ok(())
    }

    pub fn continue_if_triangulation_error(&self) -> bool {
        self.config.continue_if_triangulation_error
    }

    pub fn set_continue_if_triangulation_error(&mut self, value: bool) -> Result<()> {
        self.check_unlocked()?;
        self.config.continue_if_triangulation_error = value;
        Ok(())
    }

    pub fn vertex_key(&self) -> VertexKey {
        self.config.vertex_key
    }

    pub fn set_vertex_key(&mut self, value: VertexKey) -> Result<()> {
        self.check_unlocked()?;
        self.config.vertex_key = value;
        Ok(())
    }

    pub fn set_listener(&mut self, listener: Option<Box<dyn LoaderListener>>) -> Result<()> {
        self.check_unlocked()?;
        self.listener = listener;
        Ok(())
    }

    pub fn set_material_listener(&mut self, listener: Option<Box<dyn MaterialListener>>) -> Result<()> {
        self.check_unlocked()?;
        self.material_listener = listener;
        Ok(())
    }

    pub fn set_texture_listener(&mut self, listener: Option<Box<dyn TextureListener>>) -> Result<()> {
        self.check_unlocked()?;
        self.texture_listener = listener;
        Ok(())
    }

    /// Comments of the most recent load (PLY `comment`/`obj_info`, OBJ `#`,
    /// STL solid names).
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Materials of the most recent load, indexed by [`Material::id`].
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Checks the signature of the bound source without changing its read
    /// position. Fails with [`io::ErrorKind::NotFound`] when no source is
    /// bound.
    pub fn is_valid_file(&mut self) -> Result<bool> {
        match (self.source.as_mut(), self.format) {
            (Some(source), Some(format)) => mesh::is_valid(format, source),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, "no mesh source bound").into()),
        }
    }

    /// Starts a load cycle: locks the loader, fires the start notification
    /// and pre-scans the source.
    pub fn load(&mut self) -> Result<LoaderIterator<'_>> {
        self.check_unlocked()?;
        let format = match (&self.source, self.format) {
            (Some(_), Some(format)) => format,
            _ => return Err(LoaderError::NotReady),
        };

        self.locked = true;
        self.comments.clear();
        self.materials.clear();
        info!("Loading {:?} mesh", format);
        self.notify(|listener, loader| listener.on_load_start(loader));

        let reader = match self.open_reader(format) {
            Ok(reader) => reader,
            Err(err) => {
                warn!("Pre-scan failed: {}", err);
                self.locked = false;
                return Err(err);
            }
        };

        let mut iter = LoaderIterator {
            loader: self,
            reader,
            finished: false,
            progress: 0.0,
        };
        if !iter.reader.has_next() {
            iter.finish();
        }
        Ok(iter)
    }

    fn open_reader(&mut self, format: MeshFormat) -> Result<Box<dyn ChunkReader>> {
        let source = self.source.as_mut().ok_or(LoaderError::NotReady)?;
        let config = self.config;

        let (reader, comments): (Box<dyn ChunkReader>, _) = match format {
            MeshFormat::Obj => {
                let (reader, comments) = ObjChunkReader::open(
                    source,
                    config,
                    self.material_listener.as_mut(),
                    self.texture_listener.as_mut(),
                )?;
                self.materials = reader.materials().to_vec();
                (Box::new(reader), comments)
            }
            MeshFormat::Ply => {
                let (reader, comments) = PlyChunkReader::open(source, config)?;
                (Box::new(reader), comments)
            }
            MeshFormat::Stl => {
                let (reader, comments) = StlChunkReader::open(source, config)?;
                (Box::new(reader), comments)
            }
        };

        self.comments = comments;
        Ok(reader)
    }

    /// Calls the lifecycle listener with this loader. The listener is taken
    /// out for the duration of the call.
    fn notify(&mut self, event: impl FnOnce(&mut Box<dyn LoaderListener>, &mut Loader)) {
        if let Some(mut listener) = self.listener.take() {
            event(&mut listener, self);
            self.listener = Some(listener);
        }
    }

    /// Releases the source. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.check_unlocked()?;
        if self.source.take().is_some() {
            debug!("Closed mesh source");
        }
        self.format = None;
        Ok(())
    }
}

/// Pull iterator over the chunks of one load cycle. Keeps its loader locked;
/// the loader unlocks after the final chunk, after an error, or when the
/// iterator is dropped.
pub struct LoaderIterator<'a> {
    loader: &'a mut Loader,
    reader: Box<dyn ChunkReader>,
    finished: bool,
    progress: f32,
}

impl LoaderIterator<'_> {
    /// Whether another chunk is available. Has no side effects.
    pub fn has_next(&self) -> bool {
        !self.finished && self.reader.has_next()
    }

    /// Runs one bounded pass and returns its chunk.
    pub fn next_chunk(&mut self) -> Result<DataChunk> {
        if !self.has_next() {
            return Err(LoaderError::NotAvailable);
        }

        let result = match self.loader.source.as_mut() {
            Some(source) => self.reader.read_chunk(source),
            None => Err(LoaderError::NotReady),
        };
        let chunk = match result {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!("Load aborted: {}", err);
                self.finished = true;
                self.loader.locked = false;
                return Err(err);
            }
        };

        let progress = self.reader.progress().max(self.progress);
        self.progress = progress;
        debug!(
            "Chunk with {} vertices and {} faces, progress {:.3}",
            chunk.vertex_count(),
            chunk.face_count(),
            progress
        );
        self.loader
            .notify(|listener, loader| listener.on_load_progress_change(loader, progress));

        if !self.reader.has_next() {
            self.finish();
        }
        Ok(chunk)
    }

    /// Last reported progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Faces dropped because they could not be triangulated.
    pub fn skipped_faces(&self) -> usize {
        self.reader.skipped_faces()
    }

    pub fn comments(&self) -> &[String] {
        self.loader.comments()
    }

    pub fn materials(&self) -> &[Material] {
        self.loader.materials()
    }

    fn finish(&mut self) {
        self.loader
            .notify(|listener, loader| listener.on_load_end(loader));
        self.loader.locked = false;
        self.finished = true;
        info!("Load finished");
    }
}

impl Iterator for LoaderIterator<'_> {
    type Item = Result<DataChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.next_chunk())
        } else {
            None
        }
    }
}

impl Drop for LoaderIterator<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Load cycle ended early");
            self.loader.locked = false;
        }
    }
}
