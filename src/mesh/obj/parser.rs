use log::warn;

use crate::error::{LoaderError, Result};
use crate::mesh::color_channel;

/// One index triplet of a face, 1-based or negative (relative).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FaceIndex {
    pub(crate) vertex: i64,
    pub(crate) uv: Option<i64>,
    pub(crate) normal: Option<i64>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum Statement<'a> {
    Vertex([f32; 3], Option<[u8; 3]>),
    TextureCoordinate([f32; 2]),
    Normal([f32; 3]),
    Face(Vec<FaceIndex>),
    UseMaterial(&'a str),
    MaterialLibrary(Vec<&'a str>),
    Comment(&'a str),
    Ignored,
}

/// Record kinds that are addressed by index from faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Kind {
    Position = 0,
    TextureCoordinate = 1,
    Normal = 2,
}

impl Kind {
    pub(crate) const ALL: [Kind; 3] = [Kind::Position, Kind::TextureCoordinate, Kind::Normal];

    pub(crate) fn of(token: &str) -> Option<Self> {
        match token {
            "v" => Some(Kind::Position),
            "vt" => Some(Kind::TextureCoordinate),
            "vn" => Some(Kind::Normal),
            _ => None,
        }
    }
}

pub(crate) fn split_token(line: &str) -> (&str, &str) {
    if let Some(comment) = line.strip_prefix('#') {
        return ("#", comment.trim());
    }
    match line.split_once(char::is_whitespace) {
        Some((token, value)) => (token, value.trim()),
        None => (line, ""),
    }
}

pub(crate) fn is_known_token(token: &str) -> bool {
    matches!(
        token,
        "v" | "vt" | "vn" | "vp" | "f" | "o" | "g" | "s" | "usemtl" | "mtllib" | "#"
    )
}

// parses one trimmed, non-empty line of a wavefront obj
pub(crate) fn parse_line(line: &str) -> Result<Statement<'_>> {
    let (token, value) = split_token(line);
    Ok(match token {
        "#" => Statement::Comment(value),
        "v" => {
            let (position, color) = parse_vertex(value)?;
            Statement::Vertex(position, color)
        }
        "vt" => Statement::TextureCoordinate(parse_uv(value)?),
        "vn" => Statement::Normal(parse_normal(value)?),
        "f" => Statement::Face(parse_face(value)?),
        "usemtl" => Statement::UseMaterial(value),
        "mtllib" => Statement::MaterialLibrary(value.split_whitespace().collect()),
        // name, group, smoothing group, parameter space vertex
        "o" | "g" | "s" | "vp" => Statement::Ignored,
        _ => {
            warn!("Found invalid token: \"{}\"", token);
            Statement::Ignored
        }
    })
}

pub(crate) fn parse_vertex(value: &str) -> Result<([f32; 3], Option<[u8; 3]>)> {
    let numbers = parse_numbers(value)?;
    if numbers.len() < 3 {
        return Err(LoaderError::malformed(format!("invalid vertex: {:?}", value)));
    }

    // check for colors
    let color = if numbers.len() >= 6 {
        Some([
            color_channel(numbers[3] as f64, true),
            color_channel(numbers[4] as f64, true),
            color_channel(numbers[5] as f64, true),
        ])
    } else {
        None
    };

    Ok(([numbers[0], numbers[1], numbers[2]], color))
}

fn parse_normal(value: &str) -> Result<[f32; 3]> {
    match parse_numbers(value)?.as_slice() {
        [x, y, z, ..] => Ok([*x, *y, *z]),
        _ => Err(LoaderError::malformed(format!("invalid normal: {:?}", value))),
    }
}

fn parse_uv(value: &str) -> Result<[f32; 2]> {
    match parse_numbers(value)?.as_slice() {
        [u] => Ok([*u, 0.0]),
        [u, v, ..] => Ok([*u, *v]),
        _ => Err(LoaderError::malformed(format!(
            "invalid texture coordinate: {:?}",
            value
        ))),
    }
}

// parses numbers seperated by whitespace
fn parse_numbers(value: &str) -> Result<Vec<f32>> {
    Ok(value
        .split_whitespace()
        .map(|x| x.parse())
        .collect::<std::result::Result<Vec<f32>, _>>()?)
}

// parses triplets seperated by whitespace
pub(crate) fn parse_face(value: &str) -> Result<Vec<FaceIndex>> {
    value.split_whitespace().map(parse_face_index).collect()
}

fn parse_face_index(value: &str) -> Result<FaceIndex> {
    let triplet = parse_triplet(value)?;

    Ok(FaceIndex {
        vertex: triplet[0]
            .ok_or_else(|| LoaderError::malformed(format!("invalid face index: {:?}", value)))?,
        uv: triplet[1],
        normal: triplet[2],
    })
}

// parse a triplet seperated by slashes
fn parse_triplet(value: &str) -> Result<[Option<i64>; 3]> {
    let mut ret = [None; 3];

    for (a, b) in ret.iter_mut().zip(value.split('/')) {
        *a = if b.is_empty() { None } else { Some(b.parse()?) }
    }

    Ok(ret)
}

/// Turns a 1-based or negative index into an ordinal given the number of
/// records of its kind defined so far.
pub(crate) fn resolve_index(index: i64, defined: u64, total: u64) -> Result<u64> {
    let ordinal = if index > 0 {
        Some(index as u64 - 1)
    } else if index < 0 {
        defined.checked_sub(index.unsigned_abs())
    } else {
        None
    };

    match ordinal {
        Some(ordinal) if ordinal < total => Ok(ordinal),
        _ => Err(LoaderError::malformed(format!(
            "index {} out of range",
            index
        ))),
    }
}
