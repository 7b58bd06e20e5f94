//! Proprietary binary mesh format.
//!
//! Layout: the magic `MSHB`, one version byte, then a sequence of tagged
//! records. Every record is a tag byte followed by the `bincode` encoding of
//! its payload:
//!
//! | tag | payload |
//! |-----|---------|
//! | `0` | `Vec<Material>` |
//! | `1` | [`DataChunk`] |
//! | `2` | none, marks the end of the stream |

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use log::debug;

use crate::chunk::DataChunk;
use crate::error::{FormatError, Result};
use crate::material::Material;
use crate::MeshWriter;

pub const MAGIC: [u8; 4] = *b"MSHB";
pub const VERSION: u8 = 1;

const TAG_MATERIALS: u8 = 0;
const TAG_CHUNK: u8 = 1;
const TAG_END: u8 = 2;

pub struct BinaryMeshWriter<W: Write> {
    writer: W,
    finished: bool,
    chunks: usize,
}

impl<W: Write> BinaryMeshWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&[VERSION])?;
        Ok(BinaryMeshWriter {
            writer,
            finished: false,
            chunks: 0,
        })
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn check_open(&self) -> Result<()> {
        if self.finished {
            Err(FormatError::Finished)
        } else {
            Ok(())
        }
    }
}

impl<W: Write> MeshWriter for BinaryMeshWriter<W> {
    fn write_materials(&mut self, materials: &[Material]) -> Result<()> {
        self.check_open()?;
        self.writer.write_all(&[TAG_MATERIALS])?;
        bincode::serialize_into(&mut self.writer, materials)?;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &DataChunk) -> Result<()> {
        self.check_open()?;
        self.writer.write_all(&[TAG_CHUNK])?;
        bincode::serialize_into(&mut self.writer, chunk)?;
        self.chunks += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.check_open()?;
        self.writer.write_all(&[TAG_END])?;
        self.writer.flush()?;
        self.finished = true;
        debug!("Finished binary mesh with {} chunks", self.chunks);
        Ok(())
    }
}

/// Reads a binary mesh stream. Materials are available right after
/// construction, chunks are pulled one at a time.
pub struct BinaryMeshReader<R: Read> {
    reader: R,
    materials: Vec<Material>,
    next_tag: Option<u8>,
}

impl BinaryMeshReader<BufReader<File>> {
    pub fn from_file(path: &Path) -> Result<Self> {
        BinaryMeshReader::new(BufReader::new(File::open(path)?))
    }
}

impl<R: Read> BinaryMeshReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::InvalidMagic);
        }
        let version = read_u8(&mut reader)?;
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let mut this = BinaryMeshReader {
            reader,
            materials: Vec::new(),
            next_tag: None,
        };
        this.advance()?;
        Ok(this)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Reads the next chunk, `None` once the end record was reached.
    pub fn next_chunk(&mut self) -> Result<Option<DataChunk>> {
        match self.next_tag {
            Some(TAG_CHUNK) => {
                let chunk: DataChunk = bincode::deserialize_from(&mut self.reader)?;
                self.advance()?;
                Ok(Some(chunk))
            }
            _ => Ok(None),
        }
    }

    // reads tags up to the next chunk or the end, collecting materials on the way
    fn advance(&mut self) -> Result<()> {
        loop {
            match read_u8(&mut self.reader)? {
                TAG_MATERIALS => {
                    let mut materials: Vec<Material> =
                        bincode::deserialize_from(&mut self.reader)?;
                    self.materials.append(&mut materials);
                }
                TAG_CHUNK => {
                    self.next_tag = Some(TAG_CHUNK);
                    return Ok(());
                }
                TAG_END => {
                    self.next_tag = None;
                    return Ok(());
                }
                tag => return Err(FormatError::UnexpectedRecord(tag)),
            }
        }
    }
}

impl<R: Read> Iterator for BinaryMeshReader<R> {
    type Item = Result<DataChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(err) => {
                self.next_tag = None;
                Some(Err(err))
            }
        }
    }
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}
