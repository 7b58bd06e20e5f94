use std::io::{self, Read};
use std::str::SplitWhitespace;

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{LoaderError, Result};

use super::header::{DataType, Element, PlyFormat, Property};

pub(crate) type ReadValueFn = fn(&mut dyn Read) -> io::Result<f64>;

/// Binary decoders of one encoding, one per sized data type.
pub(crate) struct ValueReaders {
    table: [ReadValueFn; 8],
}

impl ValueReaders {
    pub(crate) fn for_format(format: PlyFormat) -> Option<Self> {
        match format {
            PlyFormat::Ascii => None,
            PlyFormat::BinaryLittleEndian => Some(ValueReaders {
                table: binary_table::<LittleEndian>(),
            }),
            PlyFormat::BinaryBigEndian => Some(ValueReaders {
                table: binary_table::<BigEndian>(),
            }),
        }
    }

    pub(crate) fn get(&self, data_type: DataType) -> ReadValueFn {
        let slot = match data_type.canonical() {
            DataType::Int8 => 0,
            DataType::Uint8 => 1,
            DataType::Int16 => 2,
            DataType::Uint16 => 3,
            DataType::Int32 => 4,
            DataType::Uint32 => 5,
            DataType::Float32 => 6,
            _ => 7,
        };
        self.table[slot]
    }
}

fn binary_table<E: ByteOrder>() -> [ReadValueFn; 8] {
    [
        |r: &mut dyn Read| r.read_i8().map(f64::from),
        |r: &mut dyn Read| r.read_u8().map(f64::from),
        |r: &mut dyn Read| r.read_i16::<E>().map(f64::from),
        |r: &mut dyn Read| r.read_u16::<E>().map(f64::from),
        |r: &mut dyn Read| r.read_i32::<E>().map(f64::from),
        |r: &mut dyn Read| r.read_u32::<E>().map(f64::from),
        |r: &mut dyn Read| r.read_f32::<E>().map(f64::from),
        |r: &mut dyn Read| r.read_f64::<E>(),
    ]
}

/// Yields the values of one record in declaration order.
pub(crate) trait ValueSource {
    fn next_value(&mut self, data_type: DataType) -> Result<f64>;
}

/// Values of an ASCII record, one whitespace separated token each.
pub(crate) struct AsciiValues<'a> {
    tokens: SplitWhitespace<'a>,
}

impl<'a> AsciiValues<'a> {
    pub(crate) fn new(line: &'a str) -> Self {
        AsciiValues {
            tokens: line.split_whitespace(),
        }
    }
}

impl ValueSource for AsciiValues<'_> {
    fn next_value(&mut self, _data_type: DataType) -> Result<f64> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| LoaderError::malformed("record has too few values"))?;
        Ok(token.parse()?)
    }
}

pub(crate) struct BinaryValues<'a, R: Read> {
    reader: &'a mut R,
    readers: &'a ValueReaders,
}

impl<'a, R: Read> BinaryValues<'a, R> {
    pub(crate) fn new(reader: &'a mut R, readers: &'a ValueReaders) -> Self {
        BinaryValues { reader, readers }
    }
}

impl<R: Read> ValueSource for BinaryValues<'_, R> {
    fn next_value(&mut self, data_type: DataType) -> Result<f64> {
        let read = self.readers.get(data_type);
        read(&mut *self.reader).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => LoaderError::malformed("unexpected end of binary data"),
            _ => LoaderError::Io(err),
        })
    }
}

/// Decodes one record of `element`, calling `visit` with the property index
/// for every scalar and for every entry of a list.
pub(crate) fn read_record<S, F>(element: &Element, values: &mut S, mut visit: F) -> Result<()>
where
    S: ValueSource + ?Sized,
    F: FnMut(usize, f64),
{
    for (index, property) in element.properties.iter().enumerate() {
        match property {
            Property::Scalar { data_type, .. } => visit(index, values.next_value(*data_type)?),
            Property::List {
                length_type,
                value_type,
                name,
            } => {
                let length = values.next_value(*length_type)?;
                if length < 0.0 || length.fract() != 0.0 {
                    return Err(LoaderError::malformed(format!(
                        "invalid length {} of list {}",
                        length, name
                    )));
                }
                for _ in 0..length as u64 {
                    visit(index, values.next_value(*value_type)?);
                }
            }
        }
    }
    Ok(())
}
