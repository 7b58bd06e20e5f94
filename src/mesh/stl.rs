//! STL in its ASCII and binary (little endian) encodings.

use std::collections::VecDeque;
use std::io;

use byteorder::{LittleEndian, ReadBytesExt};
use log::info;
use ms_format::DataChunk;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::source::MeshSource;

use super::builder::{Attributes, ChunkBuilder, Vertex};
use super::{drain_triangles, face_triangles, ratio, read_prefix, ChunkReader};

const HEADER_LEN: u64 = 80;
const FACET_LEN: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Binary,
}

/// Triangle count of a binary STL whose length matches it exactly.
fn binary_facet_count(source: &mut MeshSource) -> Result<Option<u64>> {
    let mut header = [0u8; HEADER_LEN as usize + 4];
    if read_prefix(source, &mut header)? < header.len() {
        return Ok(None);
    }
    let count = u32::from_le_bytes([header[80], header[81], header[82], header[83]]) as u64;
    if source.len() == HEADER_LEN + 4 + FACET_LEN * count {
        Ok(Some(count))
    } else {
        Ok(None)
    }
}

pub(crate) fn is_valid(source: &mut MeshSource) -> Result<bool> {
    let start = source.position();
    if binary_facet_count(source)?.is_some() {
        return Ok(true);
    }
    source.seek_to(start)?;
    let mut line = String::new();
    Ok(match source.read_content_line(&mut line) {
        Ok(Some(_)) => line.starts_with("solid"),
        Ok(None) => false,
        Err(err) if err.kind() == io::ErrorKind::InvalidData => false,
        Err(err) => return Err(err.into()),
    })
}

/// Sequential reader of STL facets. Every facet is one face whose normal is
/// given to each of its vertices.
pub(crate) struct StlChunkReader {
    config: LoaderConfig,
    encoding: Encoding,
    face_count: u64,
    faces_done: u64,
    cursor: u64,
    pending: VecDeque<[Vertex; 3]>,
    skipped: usize,
    line: String,
}

impl StlChunkReader {
    /// Detects the encoding and counts the facets. Returns the reader and
    /// the solid names (or the binary header) as comments.
    pub(crate) fn open(source: &mut MeshSource, config: LoaderConfig) -> Result<(Self, Vec<String>)> {
        source.seek_to(0)?;
        let mut comments = Vec::new();

        let (encoding, face_count) = match binary_facet_count(source)? {
            Some(count) => {
                source.seek_to(0)?;
                let mut header = [0u8; HEADER_LEN as usize];
                read_prefix(source, &mut header)?;
                let header = String::from_utf8_lossy(&header);
                let header = header.trim_matches(|c: char| c == '\0' || c.is_whitespace());
                if !header.is_empty() {
                    comments.push(header.to_owned());
                }
                (Encoding::Binary, count)
            }
            None => {
                source.seek_to(0)?;
                (Encoding::Ascii, prescan_ascii(source, &mut comments)?)
            }
        };

        info!("STL {:?}: {} facets", encoding, face_count);
        let cursor = match encoding {
            Encoding::Binary => HEADER_LEN + 4,
            Encoding::Ascii => 0,
        };
        let mut reader = StlChunkReader {
            config,
            encoding,
            face_count,
            faces_done: 0,
            cursor,
            pending: VecDeque::new(),
            skipped: 0,
            line: String::new(),
        };
        reader.read_ahead(source)?;
        Ok((reader, comments))
    }

    fn triangulate_next_facet(&mut self, source: &mut MeshSource) -> Result<()> {
        let facet = self.read_facet(source)?;
        self.faces_done += 1;
        let triangles = face_triangles(
            &facet,
            self.config.continue_if_triangulation_error,
            &mut self.skipped,
        )?;
        self.pending.extend(triangles);
        Ok(())
    }

    /// Reads on until a facet yields a triangle, so skipped facets at the
    /// end never produce an empty chunk.
    fn read_ahead(&mut self, source: &mut MeshSource) -> Result<()> {
        if !self.pending.is_empty() || self.faces_done == self.face_count {
            return Ok(());
        }
        source.seek_to(self.cursor)?;
        while self.pending.is_empty() && self.faces_done < self.face_count {
            self.triangulate_next_facet(source)?;
        }
        self.cursor = source.position();
        Ok(())
    }

    fn read_facet(&mut self, source: &mut MeshSource) -> Result<Vec<Vertex>> {
        match self.encoding {
            Encoding::Binary => read_binary_facet(source).map_err(|err| match err.kind() {
                io::ErrorKind::UnexpectedEof => LoaderError::malformed("truncated facet"),
                _ => LoaderError::Io(err),
            }),
            Encoding::Ascii => self.read_ascii_facet(source),
        }
    }

    fn next_line(&mut self, source: &mut MeshSource) -> Result<()> {
        match read_text_line(source, &mut self.line)? {
            Some(_) => Ok(()),
            None => Err(LoaderError::malformed("unexpected end of file")),
        }
    }

    fn read_ascii_facet(&mut self, source: &mut MeshSource) -> Result<Vec<Vertex>> {
        // solids may follow each other
        loop {
            self.next_line(source)?;
            if !self.line.starts_with("solid") && !self.line.starts_with("endsolid") {
                break;
            }
        }

        let normal = match tokens(&self.line).as_slice() {
            ["facet", "normal", values @ ..] => parse_vector(values)?,
            _ => return Err(unexpected("facet normal", &self.line)),
        };

        self.next_line(source)?;
        if tokens(&self.line) != ["outer", "loop"] {
            return Err(unexpected("outer loop", &self.line));
        }

        let mut facet = Vec::with_capacity(3);
        loop {
            self.next_line(source)?;
            match tokens(&self.line).as_slice() {
                ["vertex", values @ ..] => facet.push(Vertex {
                    position: parse_vector(values)?,
                    normal: Some(normal),
                    ..Vertex::default()
                }),
                ["endloop"] => break,
                _ => return Err(unexpected("vertex", &self.line)),
            }
        }

        self.next_line(source)?;
        if self.line != "endfacet" {
            return Err(unexpected("endfacet", &self.line));
        }
        Ok(facet)
    }
}

fn read_binary_facet(source: &mut MeshSource) -> io::Result<Vec<Vertex>> {
    let mut vector = || -> io::Result<[f32; 3]> {
        Ok([
            source.read_f32::<LittleEndian>()?,
            source.read_f32::<LittleEndian>()?,
            source.read_f32::<LittleEndian>()?,
        ])
    };

    let normal = vector()?;
    let mut facet = Vec::with_capacity(3);
    for _ in 0..3 {
        facet.push(Vertex {
            position: vector()?,
            normal: Some(normal),
            ..Vertex::default()
        });
    }
    // attribute byte count
    source.read_u16::<LittleEndian>()?;
    Ok(facet)
}

fn prescan_ascii(source: &mut MeshSource, comments: &mut Vec<String>) -> Result<u64> {
    let mut line = String::new();
    if read_text_line(source, &mut line)?.is_none() || !line.starts_with("solid") {
        return Err(LoaderError::malformed("missing solid"));
    }

    let mut facets = 0;
    loop {
        if let Some(name) = line.strip_prefix("solid") {
            let name = name.trim();
            if !name.is_empty() {
                comments.push(name.to_owned());
            }
        } else if line.starts_with("facet") {
            facets += 1;
        }
        if read_text_line(source, &mut line)?.is_none() {
            break;
        }
    }
    Ok(facets)
}

fn read_text_line(source: &mut MeshSource, line: &mut String) -> Result<Option<u64>> {
    source.read_content_line(line).map_err(|err| match err.kind() {
        io::ErrorKind::InvalidData => LoaderError::malformed("neither binary nor text STL"),
        _ => LoaderError::Io(err),
    })
}

fn tokens(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn parse_vector(values: &[&str]) -> Result<[f32; 3]> {
    match values {
        [x, y, z] => Ok([x.parse()?, y.parse()?, z.parse()?]),
        _ => Err(LoaderError::malformed(format!(
            "expected 3 numbers, found {}",
            values.len()
        ))),
    }
}

fn unexpected(expected: &str, line: &str) -> LoaderError {
    LoaderError::malformed(format!("expected {}, found {:?}", expected, line))
}

impl ChunkReader for StlChunkReader {
    fn has_next(&self) -> bool {
        self.faces_done < self.face_count || !self.pending.is_empty()
    }

    fn progress(&self) -> f32 {
        if !self.has_next() {
            return 1.0;
        }
        let partial = !self.pending.is_empty() as u64;
        ratio(self.faces_done.saturating_sub(partial), self.face_count)
    }

    fn read_chunk(&mut self, source: &mut MeshSource) -> Result<DataChunk> {
        let attributes = Attributes {
            normals: true,
            ..Attributes::default()
        };
        let mut builder = ChunkBuilder::new(&self.config, attributes);
        source.seek_to(self.cursor)?;

        while drain_triangles(&mut builder, &mut self.pending) && self.faces_done < self.face_count {
            self.triangulate_next_facet(source)?;
        }

        self.cursor = source.position();
        self.read_ahead(source)?;
        Ok(builder.build())
    }

    fn skipped_faces(&self) -> usize {
        self.skipped
    }
}
