//! Schema-driven decoder for ZIP records.
//!
//! Every record kind in [`structures`](super::structures) is described as an
//! ordered list of [`FieldSpec`]s and read by the single [`decode`] routine.
//! The typed record structs are then built from the resulting [`RawRecord`].

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::{Error, Result};

/// One field of a record layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSpec {
    /// Little-endian unsigned integer of 1, 2, 4 or 8 bytes.
    Int { name: &'static str, width: usize },
    /// Raw bytes whose length is the value of an earlier integer field.
    Text {
        name: &'static str,
        length_field: &'static str,
    },
}

impl FieldSpec {
    pub const fn int(name: &'static str, width: usize) -> Self {
        FieldSpec::Int { name, width }
    }

    pub const fn text(name: &'static str, length_field: &'static str) -> Self {
        FieldSpec::Text { name, length_field }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            FieldSpec::Int { name, .. } | FieldSpec::Text { name, .. } => name,
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(u64),
    Text(Vec<u8>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Text(bytes) => Some(bytes),
            FieldValue::Int(_) => None,
        }
    }
}

/// Field values in schema order, addressed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(&'static str, FieldValue)>,
}

impl RawRecord {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Integer value of `name`. Non-integer fields read as zero.
    ///
    /// Asking for a field the layout does not have is a bug in the caller and
    /// panics in debug builds.
    pub fn int(&self, name: &str) -> u64 {
        let value = self.get(name);
        debug_assert!(value.is_some(), "unknown field {name:?}");
        value.and_then(FieldValue::as_int).unwrap_or(0)
    }

    /// Bytes of text field `name`. Non-text fields read as empty.
    pub fn bytes(&self, name: &str) -> &[u8] {
        let value = self.get(name);
        debug_assert!(value.is_some(), "unknown field {name:?}");
        value.and_then(FieldValue::as_bytes).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decode `schema` from `data` starting at `offset`.
///
/// Returns the decoded fields and the number of bytes consumed.
pub fn decode(schema: &[FieldSpec], data: &[u8], offset: usize) -> Result<(RawRecord, usize)> {
    let tail = data.get(offset..).ok_or_else(|| Error::Truncated {
        offset,
        needed: offset - data.len(),
    })?;
    let mut cursor = Cursor::new(tail);
    let mut record = RawRecord {
        fields: Vec::with_capacity(schema.len()),
    };

    for spec in schema {
        let value = match *spec {
            FieldSpec::Int { width, .. } => {
                if !matches!(width, 1 | 2 | 4 | 8) {
                    return Err(Error::Decode { width });
                }
                ensure_remaining(&cursor, width, offset)?;
                let value = match width {
                    1 => cursor.read_u8()? as u64,
                    2 => cursor.read_u16::<LittleEndian>()? as u64,
                    4 => cursor.read_u32::<LittleEndian>()? as u64,
                    _ => cursor.read_u64::<LittleEndian>()?,
                };
                FieldValue::Int(value)
            }
            FieldSpec::Text { length_field, .. } => {
                let len = record
                    .get(length_field)
                    .and_then(FieldValue::as_int)
                    .ok_or(Error::UnknownLengthField {
                        field: length_field,
                    })? as usize;
                ensure_remaining(&cursor, len, offset)?;
                let mut buf = vec![0u8; len];
                cursor.read_exact(&mut buf)?;
                FieldValue::Text(buf)
            }
        };
        record.fields.push((spec.name(), value));
    }

    Ok((record, cursor.position() as usize))
}

fn ensure_remaining(cursor: &Cursor<&[u8]>, len: usize, offset: usize) -> Result<()> {
    let available = cursor.get_ref().len() - cursor.position() as usize;
    if available < len {
        return Err(Error::Truncated {
            offset,
            needed: len - available,
        });
    }
    Ok(())
}

/// Decode bytes one per character (ISO-8859-1), never as UTF-8.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}
