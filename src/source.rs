use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Byte source a loader can read from. Seeking is required to re-read vertex
/// records that were already passed.
pub trait SeekRead: Read + Seek {}

impl<T: Read + Seek> SeekRead for T {}

/// Buffered, seekable source that keeps track of its byte offset.
pub struct MeshSource {
    reader: BufReader<Box<dyn SeekRead>>,
    position: u64,
    len: u64,
    path: Option<PathBuf>,
}

impl MeshSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut source = MeshSource::new(Box::new(file))?;
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    pub fn new(mut inner: Box<dyn SeekRead>) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(MeshSource {
            reader: BufReader::new(inner),
            position: 0,
            len,
            path: None,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves to `offset`, keeping the buffer when already there.
    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        if offset != self.position {
            self.reader.seek(SeekFrom::Start(offset))?;
            self.position = offset;
        }
        Ok(())
    }

    /// Reads one line including its terminator, returns the number of bytes
    /// consumed (0 at the end of the source).
    pub fn read_line(&mut self, line: &mut String) -> io::Result<usize> {
        line.clear();
        match self.reader.read_line(line) {
            Ok(read) => {
                self.position += read as u64;
                Ok(read)
            }
            Err(err) => {
                // bytes may have been consumed, resync the tracked offset
                self.position = self.reader.stream_position()?;
                Err(err)
            }
        }
    }

    /// Next line that is not blank, trimmed, with the offset it starts at.
    pub fn read_content_line(&mut self, line: &mut String) -> io::Result<Option<u64>> {
        loop {
            let start = self.position;
            if self.read_line(line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                if trimmed.len() != line.len() {
                    *line = trimmed.to_owned();
                }
                return Ok(Some(start));
            }
        }
    }
}

impl Read for MeshSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.reader.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn source(data: &str) -> MeshSource {
        MeshSource::new(Box::new(Cursor::new(data.as_bytes().to_vec()))).unwrap()
    }

    #[test]
    fn test_track_position() -> io::Result<()> {
        let mut source = source("ply\n\n  format ascii 1.0  \r\nend");
        assert_eq!(source.len(), 30);

        let mut line = String::new();
        assert_eq!(source.read_content_line(&mut line)?, Some(0));
        assert_eq!(line, "ply");
        assert_eq!(source.read_content_line(&mut line)?, Some(5));
        assert_eq!(line, "format ascii 1.0");
        assert_eq!(source.position(), 27);

        let mut rest = [0u8; 3];
        source.read_exact(&mut rest)?;
        assert_eq!(&rest, b"end");
        assert_eq!(source.read_content_line(&mut line)?, None);

        source.seek_to(4)?;
        assert_eq!(source.read_content_line(&mut line)?, Some(5));
        assert_eq!(line, "format ascii 1.0");
        Ok(())
    }
}
