use crate::error::{LoaderError, Result};
use crate::source::MeshSource;

/// Primitive data types a PLY property may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    Char,
    Uchar,
    Short,
    Ushort,
    Int,
    Uint,
    Float,
    Double,
}

impl DataType {
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "int8" => DataType::Int8,
            "uint8" => DataType::Uint8,
            "int16" => DataType::Int16,
            "uint16" => DataType::Uint16,
            "int32" => DataType::Int32,
            "uint32" => DataType::Uint32,
            "float32" => DataType::Float32,
            "float64" => DataType::Float64,
            "char" => DataType::Char,
            "uchar" => DataType::Uchar,
            "short" => DataType::Short,
            "ushort" => DataType::Ushort,
            "int" => DataType::Int,
            "uint" => DataType::Uint,
            "float" => DataType::Float,
            "double" => DataType::Double,
            _ => return None,
        })
    }

    /// The sized type an alias stands for.
    pub fn canonical(self) -> Self {
        match self {
            DataType::Char => DataType::Int8,
            DataType::Uchar => DataType::Uint8,
            DataType::Short => DataType::Int16,
            DataType::Ushort => DataType::Uint16,
            DataType::Int => DataType::Int32,
            DataType::Uint => DataType::Uint32,
            DataType::Float => DataType::Float32,
            DataType::Double => DataType::Float64,
            sized => sized,
        }
    }

    /// Width in bytes of the binary encoding.
    pub fn size(self) -> usize {
        match self.canonical() {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
            _ => 8,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self.canonical(), DataType::Float32 | DataType::Float64)
    }
}

/// Body encoding declared by the `format` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Scalar {
        name: String,
        data_type: DataType,
    },
    List {
        name: String,
        length_type: DataType,
        value_type: DataType,
    },
}

impl Property {
    pub fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub count: u64,
    pub properties: Vec<Property>,
}

impl Element {
    /// Binary size of one record, `None` when it holds list properties.
    pub fn record_size(&self) -> Option<u64> {
        self.properties
            .iter()
            .map(|p| match p {
                Property::Scalar { data_type, .. } => Some(data_type.size() as u64),
                Property::List { .. } => None,
            })
            .sum()
    }

    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlyHeader {
    pub format: PlyFormat,
    pub version: String,
    pub comments: Vec<String>,
    pub elements: Vec<Element>,
    /// Offset of the first body byte, right after `end_header`.
    pub body_offset: u64,
}

impl PlyHeader {
    pub fn element_index(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }
}

/// Parses the header at the current position of `source`, leaving it at the
/// start of the body.
pub(crate) fn parse_header(source: &mut MeshSource) -> Result<PlyHeader> {
    let mut line = String::new();

    match source.read_content_line(&mut line)? {
        Some(_) if line == "ply" => {}
        _ => return Err(LoaderError::malformed("missing ply signature")),
    }

    let mut format: Option<(PlyFormat, String)> = None;
    let mut comments = Vec::new();
    let mut elements: Vec<Element> = Vec::new();

    loop {
        if source.read_content_line(&mut line)?.is_none() {
            return Err(LoaderError::malformed("missing end_header"));
        }

        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line.as_str(), ""),
        };
        let tokens: Vec<&str> = rest.split_whitespace().collect();

        match keyword {
            "comment" => comments.push(rest.to_owned()),
            "obj_info" => comments.push(rest.to_owned()),
            "format" => {
                if format.is_some() {
                    return Err(LoaderError::malformed("duplicate format line"));
                }
                format = Some(parse_format(&tokens)?);
            }
            "element" => elements.push(parse_element(&tokens)?),
            "property" => {
                let element = elements.last_mut().ok_or_else(|| {
                    LoaderError::malformed("property declared before any element")
                })?;
                element.properties.push(parse_property(&tokens)?);
            }
            "end_header" if tokens.is_empty() => break,
            _ => {
                return Err(LoaderError::malformed(format!(
                    "unrecognized header line: {:?}",
                    line
                )))
            }
        }
    }

    let (format, version) = format.ok_or_else(|| LoaderError::malformed("missing format line"))?;

    Ok(PlyHeader {
        format,
        version,
        comments,
        elements,
        body_offset: source.position(),
    })
}

fn parse_format(tokens: &[&str]) -> Result<(PlyFormat, String)> {
    let format = match tokens {
        [format, _version] => match *format {
            "ascii" => PlyFormat::Ascii,
            "binary_little_endian" => PlyFormat::BinaryLittleEndian,
            "binary_big_endian" => PlyFormat::BinaryBigEndian,
            other => {
                return Err(LoaderError::malformed(format!(
                    "unknown format: {}",
                    other
                )))
            }
        },
        _ => return Err(LoaderError::malformed("invalid format line")),
    };
    Ok((format, tokens[1].to_owned()))
}

fn parse_element(tokens: &[&str]) -> Result<Element> {
    match tokens {
        [name, count] => Ok(Element {
            name: (*name).to_owned(),
            count: count
                .parse()
                .map_err(|_| LoaderError::malformed(format!("invalid element count: {}", count)))?,
            properties: Vec::new(),
        }),
        _ => Err(LoaderError::malformed("invalid element line")),
    }
}

fn parse_property(tokens: &[&str]) -> Result<Property> {
    match tokens {
        ["list", length_type, value_type, name] => Ok(Property::List {
            name: (*name).to_owned(),
            length_type: parse_type(length_type)?,
            value_type: parse_type(value_type)?,
        }),
        [data_type, name] => Ok(Property::Scalar {
            name: (*name).to_owned(),
            data_type: parse_type(data_type)?,
        }),
        _ => Err(LoaderError::malformed("invalid property line")),
    }
}

fn parse_type(token: &str) -> Result<DataType> {
    DataType::parse(token)
        .ok_or_else(|| LoaderError::malformed(format!("unsupported property type: {}", token)))
}
