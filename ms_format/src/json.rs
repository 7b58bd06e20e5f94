//! JSON mesh format: `{"version":1,"materials":[...],"chunks":[...]}`.
//!
//! The writer streams chunks as they arrive, the reader loads the whole
//! document.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunk::DataChunk;
use crate::error::{FormatError, Result};
use crate::material::Material;
use crate::MeshWriter;

pub const VERSION: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshDocument {
    pub version: u8,
    pub materials: Vec<Material>,
    pub chunks: Vec<DataChunk>,
}

impl MeshDocument {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: MeshDocument = serde_json::from_reader(reader)?;
        if document.version != VERSION {
            return Err(FormatError::UnsupportedVersion(document.version));
        }
        Ok(document)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        MeshDocument::from_reader(BufReader::new(File::open(path)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Chunks { first: bool },
    Finished,
}

pub struct JsonMeshWriter<W: Write> {
    writer: W,
    state: State,
}

impl<W: Write> JsonMeshWriter<W> {
    pub fn new(writer: W) -> Self {
        JsonMeshWriter {
            writer,
            state: State::Start,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MeshWriter for JsonMeshWriter<W> {
    fn write_materials(&mut self, materials: &[Material]) -> Result<()> {
        match self.state {
            State::Start => {
                write!(self.writer, "{{\"version\":{},\"materials\":", VERSION)?;
                serde_json::to_writer(&mut self.writer, materials)?;
                self.writer.write_all(b",\"chunks\":[")?;
                self.state = State::Chunks { first: true };
                Ok(())
            }
            // materials precede the chunk array
            State::Chunks { .. } => Err(FormatError::UnexpectedRecord(0)),
            State::Finished => Err(FormatError::Finished),
        }
    }

    fn write_chunk(&mut self, chunk: &DataChunk) -> Result<()> {
        if self.state == State::Start {
            self.write_materials(&[])?;
        }
        match self.state {
            State::Chunks { first } => {
                if !first {
                    self.writer.write_all(b",")?;
                }
                serde_json::to_writer(&mut self.writer, chunk)?;
                self.state = State::Chunks { first: false };
                Ok(())
            }
            _ => Err(FormatError::Finished),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.state == State::Start {
            self.write_materials(&[])?;
        }
        if self.state == State::Finished {
            return Err(FormatError::Finished);
        }
        self.writer.write_all(b"]}")?;
        self.writer.flush()?;
        self.state = State::Finished;
        Ok(())
    }
}
