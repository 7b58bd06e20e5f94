//! Polygon File Format in ASCII and both binary encodings.

pub mod header;
mod reader;
mod value;

pub use self::header::{DataType, Element, PlyFormat, PlyHeader, Property};
pub(crate) use self::reader::PlyChunkReader;

use crate::error::Result;
use crate::source::MeshSource;

use super::read_prefix;

/// Checks for the `ply` signature line at the current position.
pub(crate) fn is_valid(source: &mut MeshSource) -> Result<bool> {
    let mut signature = [0u8; 4];
    let read = read_prefix(source, &mut signature)?;
    Ok(read == 4 && &signature[..3] == b"ply" && matches!(signature[3], b'\n' | b'\r'))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    fn check(data: &[u8]) -> Result<bool> {
        let mut source = MeshSource::new(Box::new(Cursor::new(data.to_vec())))?;
        is_valid(&mut source)
    }

    #[test]
    fn test_signature() -> Result<()> {
        assert!(check(b"ply\nformat ascii 1.0\n")?);
        assert!(check(b"ply\r\nformat ascii 1.0\r\n")?);
        assert!(!check(b"plyx\n")?);
        assert!(!check(b"pl")?);
        assert!(!check(b"solid cube\n")?);
        Ok(())
    }
}
