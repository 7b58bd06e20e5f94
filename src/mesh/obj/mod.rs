//! Wavefront OBJ (https://en.wikipedia.org/wiki/Wavefront_.obj_file).

mod parser;
mod reader;

pub(crate) use self::reader::ObjChunkReader;

use crate::error::Result;
use crate::source::MeshSource;

use super::read_prefix;

const SNIFF_LEN: usize = 4096;

/// Accepts a source whose first statement is a known OBJ directive. A prefix
/// made of comments only is accepted as well.
pub(crate) fn is_valid(source: &mut MeshSource) -> Result<bool> {
    let mut buffer = vec![0u8; SNIFF_LEN];
    let read = read_prefix(source, &mut buffer)?;
    buffer.truncate(read);

    let text = String::from_utf8_lossy(&buffer);
    let mut lines: Vec<&str> = text.lines().collect();
    if read == SNIFF_LEN && lines.len() > 1 {
        // the last line may be cut off
        lines.pop();
    }

    let mut comments = false;
    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let (token, _) = parser::split_token(line);
        if token == "#" {
            comments = true;
            continue;
        }
        return Ok(parser::is_known_token(token));
    }
    Ok(comments)
}
