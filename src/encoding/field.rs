//! # Field Encodings
//!
//! Per-type encode/decode of a scalar [`Value`] into and out of a row's
//! bytes. Every field type is classified as fixed-size (width determined by
//! the type alone) or variable-size (width recorded in the row's offset
//! table, bounded by a declared maximum).
//!
//! ## Storage Classes
//!
//! | Class | Types | Storage |
//! |-------|-------|---------|
//! | **Fixed** | bool, int(1,2,3,4,8), float4, float8, date, time, timestamp | direct little-endian bytes |
//! | **Variable** | varchar, varbinary, decimal | payload section, cumulative offset slot |
//!
//! Integer fields are stored as their low `width` bytes; reads extract
//! unsigned-by-width and sign-extend only when the type is declared signed.
//! String payloads are raw bytes in the field's character set and decode
//! under that set.

use std::borrow::Cow;

use eyre::Result;

use crate::encoding::bytes;
use crate::error::Error;
use crate::types::Value;

/// Character set of a string field's stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf8,
    Latin1,
}

impl Charset {
    /// Worst-case encoded bytes per character.
    pub fn max_bytes_per_char(&self) -> usize {
        match self {
            Charset::Utf8 => 4,
            Charset::Latin1 => 1,
        }
    }
}

/// Declared type of one field, fixing its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int { width: u8, signed: bool },
    Float4,
    Float8,
    Date,
    Time,
    Timestamp,
    Decimal,
    Varchar { max_chars: u32, charset: Charset },
    Varbinary { max_bytes: u32 },
}

/// Stored size of a decimal payload: sign byte, i16 scale, i128 digits.
const DECIMAL_STORAGE: usize = 19;

impl FieldType {
    /// `Some(width)` for fixed-size types, `None` for variable-size ones.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            FieldType::Bool => Some(1),
            FieldType::Int { width, .. } => Some(*width as usize),
            FieldType::Float4 => Some(4),
            FieldType::Float8 => Some(8),
            FieldType::Date => Some(4),
            FieldType::Time => Some(8),
            FieldType::Timestamp => Some(8),
            FieldType::Decimal | FieldType::Varchar { .. } | FieldType::Varbinary { .. } => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        self.fixed_size().is_none()
    }

    /// Maximum bytes a value of this type can occupy in the payload.
    pub fn max_storage_size(&self) -> usize {
        match self {
            FieldType::Decimal => DECIMAL_STORAGE,
            FieldType::Varchar { max_chars, charset } => {
                *max_chars as usize * charset.max_bytes_per_char()
            }
            FieldType::Varbinary { max_bytes } => *max_bytes as usize,
            fixed => fixed.fixed_size().unwrap_or(0),
        }
    }
}

/// Bytes `value` will occupy when encoded as `field_type`. Variable-size
/// values exceeding the field's declared maximum are rejected here, before
/// any buffer sizing happens.
pub fn encoded_width(field_type: &FieldType, value: &Value<'_>) -> Result<usize> {
    match field_type {
        FieldType::Decimal => Ok(DECIMAL_STORAGE),
        FieldType::Varchar { max_chars, charset } => match value {
            Value::Text(s) => {
                let chars = s.chars().count();
                if chars > *max_chars as usize {
                    return Err(Error::encoding(format!(
                        "string of {} characters exceeds varchar({}) maximum",
                        chars, max_chars
                    )));
                }
                match charset {
                    Charset::Utf8 => Ok(s.len()),
                    Charset::Latin1 => Ok(chars),
                }
            }
            other => Err(Error::encoding(format!(
                "cannot store {:?} in a varchar field",
                other.conversion_type()
            ))),
        },
        FieldType::Varbinary { max_bytes } => match value {
            Value::Binary(b) => {
                if b.len() > *max_bytes as usize {
                    return Err(Error::encoding(format!(
                        "binary value of {} bytes exceeds varbinary({}) maximum",
                        b.len(),
                        max_bytes
                    )));
                }
                Ok(b.len())
            }
            other => Err(Error::encoding(format!(
                "cannot store {:?} in a varbinary field",
                other.conversion_type()
            ))),
        },
        fixed => Ok(fixed.fixed_size().unwrap_or(0)),
    }
}

/// Encodes `value` at `buf[offset..]`, returning the bytes written.
///
/// The caller guarantees the buffer is large enough for
/// `encoded_width(field_type, value)` bytes; a short buffer is reported as
/// an encoding error so construction can retry with a grown buffer.
pub fn encode(field_type: &FieldType, value: &Value<'_>, buf: &mut [u8], offset: usize) -> Result<usize> {
    let width = encoded_width(field_type, value)?;
    if offset + width > buf.len() {
        return Err(Error::encoding(format!(
            "field of {} bytes at offset {} overflows buffer of {} bytes",
            width,
            offset,
            buf.len()
        )));
    }
    match field_type {
        FieldType::Bool => {
            let b = value
                .as_bool()
                .map_err(|e| Error::encoding(e.to_string()))?;
            buf[offset] = b as u8;
        }
        FieldType::Int { width, signed } => {
            let v = value.as_int().map_err(|e| Error::encoding(e.to_string()))?;
            let ok = if *signed {
                bytes::fits_signed(v, *width as usize)
            } else {
                bytes::fits_unsigned(v, *width as usize)
            };
            if !ok {
                return Err(Error::encoding(format!(
                    "integer {} does not fit a {}-byte {} field",
                    v,
                    width,
                    if *signed { "signed" } else { "unsigned" }
                )));
            }
            bytes::put_uint(buf, offset, *width as usize, v as u64)?;
        }
        FieldType::Float4 => {
            let f = value
                .as_float()
                .map_err(|e| Error::encoding(e.to_string()))?;
            buf[offset..offset + 4].copy_from_slice(&(f as f32).to_le_bytes());
        }
        FieldType::Float8 => {
            let f = value
                .as_float()
                .map_err(|e| Error::encoding(e.to_string()))?;
            buf[offset..offset + 8].copy_from_slice(&f.to_le_bytes());
        }
        FieldType::Date => {
            let d = value.as_int().map_err(|e| Error::encoding(e.to_string()))?;
            if !bytes::fits_signed(d, 4) {
                return Err(Error::encoding(format!("date value {} out of range", d)));
            }
            bytes::put_uint(buf, offset, 4, d as u64)?;
        }
        FieldType::Time | FieldType::Timestamp => {
            let t = value.as_int().map_err(|e| Error::encoding(e.to_string()))?;
            bytes::put_uint(buf, offset, 8, t as u64)?;
        }
        FieldType::Decimal => match value {
            Value::Decimal { digits, scale } => {
                buf[offset] = if *digits < 0 { 0x80 } else { 0x00 };
                buf[offset + 1..offset + 3].copy_from_slice(&scale.to_le_bytes());
                buf[offset + 3..offset + 19].copy_from_slice(&digits.to_le_bytes());
            }
            other => {
                return Err(Error::encoding(format!(
                    "cannot store {:?} in a decimal field",
                    other.conversion_type()
                )))
            }
        },
        FieldType::Varchar { charset, .. } => {
            let s = value.as_str().map_err(|e| Error::encoding(e.to_string()))?;
            match charset {
                Charset::Utf8 => buf[offset..offset + width].copy_from_slice(s.as_bytes()),
                Charset::Latin1 => {
                    for (i, ch) in s.chars().enumerate() {
                        let code = ch as u32;
                        if code > 0xFF {
                            return Err(Error::encoding(format!(
                                "character {:?} is not representable in latin1",
                                ch
                            )));
                        }
                        buf[offset + i] = code as u8;
                    }
                }
            }
        }
        FieldType::Varbinary { .. } => {
            let b = value
                .as_bytes()
                .map_err(|e| Error::encoding(e.to_string()))?;
            buf[offset..offset + width].copy_from_slice(b);
        }
    }
    Ok(width)
}

/// Decodes the field stored at `buf[offset..offset + width]`.
pub fn decode(field_type: &FieldType, buf: &[u8], offset: usize, width: usize) -> Result<Value<'static>> {
    match field_type {
        FieldType::Bool => Ok(Value::Bool(buf[offset] != 0)),
        FieldType::Int { width, signed } => {
            if *signed {
                Ok(Value::Int(bytes::get_int(buf, offset, *width as usize)?))
            } else {
                let raw = bytes::get_uint(buf, offset, *width as usize)?;
                Ok(Value::Int(raw as i64))
            }
        }
        FieldType::Float4 => {
            let raw: [u8; 4] = buf[offset..offset + 4]
                .try_into()
                .map_err(|_| Error::corrupt("truncated float4 field"))?;
            Ok(Value::Float(f32::from_le_bytes(raw) as f64))
        }
        FieldType::Float8 => {
            let raw: [u8; 8] = buf[offset..offset + 8]
                .try_into()
                .map_err(|_| Error::corrupt("truncated float8 field"))?;
            Ok(Value::Float(f64::from_le_bytes(raw)))
        }
        FieldType::Date => Ok(Value::Date(bytes::get_int(buf, offset, 4)? as i32)),
        FieldType::Time => Ok(Value::Time(bytes::get_int(buf, offset, 8)?)),
        FieldType::Timestamp => Ok(Value::Timestamp(bytes::get_int(buf, offset, 8)?)),
        FieldType::Decimal => {
            if width != DECIMAL_STORAGE {
                return Err(Error::corrupt(format!(
                    "decimal payload of {} bytes, expected {}",
                    width, DECIMAL_STORAGE
                )));
            }
            let scale = i16::from_le_bytes(
                buf[offset + 1..offset + 3]
                    .try_into()
                    .map_err(|_| Error::corrupt("truncated decimal scale"))?,
            );
            let digits = i128::from_le_bytes(
                buf[offset + 3..offset + 19]
                    .try_into()
                    .map_err(|_| Error::corrupt("truncated decimal digits"))?,
            );
            Ok(Value::Decimal { digits, scale })
        }
        FieldType::Varchar { charset, .. } => {
            let raw = &buf[offset..offset + width];
            match charset {
                Charset::Utf8 => {
                    let s = std::str::from_utf8(raw)
                        .map_err(|e| Error::corrupt(format!("invalid utf8 payload: {}", e)))?;
                    Ok(Value::Text(Cow::Owned(s.to_string())))
                }
                Charset::Latin1 => {
                    let s: String = raw.iter().map(|&b| b as char).collect();
                    Ok(Value::Text(Cow::Owned(s)))
                }
            }
        }
        FieldType::Varbinary { .. } => Ok(Value::Binary(Cow::Owned(
            buf[offset..offset + width].to_vec(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_and_variable_classification() {
        assert_eq!(FieldType::Bool.fixed_size(), Some(1));
        assert_eq!(
            FieldType::Int {
                width: 3,
                signed: true
            }
            .fixed_size(),
            Some(3)
        );
        assert!(FieldType::Decimal.is_variable());
        assert!(FieldType::Varchar {
            max_chars: 16,
            charset: Charset::Utf8
        }
        .is_variable());
        assert_eq!(
            FieldType::Varchar {
                max_chars: 16,
                charset: Charset::Utf8
            }
            .max_storage_size(),
            64
        );
        assert_eq!(
            FieldType::Varchar {
                max_chars: 16,
                charset: Charset::Latin1
            }
            .max_storage_size(),
            16
        );
    }

    #[test]
    fn int_round_trip_signed_and_unsigned() {
        let mut buf = [0u8; 8];
        let signed = FieldType::Int {
            width: 2,
            signed: true,
        };
        encode(&signed, &Value::Int(-300), &mut buf, 0).unwrap();
        assert_eq!(decode(&signed, &buf, 0, 2).unwrap(), Value::Int(-300));

        let unsigned = FieldType::Int {
            width: 2,
            signed: false,
        };
        encode(&unsigned, &Value::Int(0xFFFE), &mut buf, 0).unwrap();
        assert_eq!(decode(&unsigned, &buf, 0, 2).unwrap(), Value::Int(0xFFFE));
    }

    #[test]
    fn int_overflow_is_an_encoding_error() {
        let mut buf = [0u8; 8];
        let ty = FieldType::Int {
            width: 1,
            signed: true,
        };
        let err = encode(&ty, &Value::Int(200), &mut buf, 0).unwrap_err();
        assert!(crate::error::is_kind(
            &err,
            &Error::Encoding(String::new())
        ));
    }

    #[test]
    fn varchar_respects_charset() {
        let mut buf = [0u8; 32];
        let latin = FieldType::Varchar {
            max_chars: 8,
            charset: Charset::Latin1,
        };
        let n = encode(&latin, &Value::from("héllo"), &mut buf, 0).unwrap();
        assert_eq!(n, 5);
        assert_eq!(
            decode(&latin, &buf, 0, 5).unwrap(),
            Value::from("héllo").into_owned()
        );

        let err = encode(&latin, &Value::from("日本"), &mut buf, 0).unwrap_err();
        assert!(crate::error::is_kind(
            &err,
            &Error::Encoding(String::new())
        ));
    }

    #[test]
    fn oversized_variable_value_is_rejected() {
        let mut buf = [0u8; 64];
        let ty = FieldType::Varbinary { max_bytes: 4 };
        let err = encode(&ty, &Value::Binary(Cow::Borrowed(&[0u8; 5])), &mut buf, 0).unwrap_err();
        assert!(crate::error::is_kind(
            &err,
            &Error::Encoding(String::new())
        ));
    }

    #[test]
    fn decimal_round_trip() {
        let mut buf = [0u8; 32];
        let v = Value::Decimal {
            digits: -1234567890123,
            scale: 4,
        };
        let n = encode(&FieldType::Decimal, &v, &mut buf, 2).unwrap();
        assert_eq!(n, 19);
        assert_eq!(decode(&FieldType::Decimal, &buf, 2, 19).unwrap(), v);
    }
}
