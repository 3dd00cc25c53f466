//! # RowData - Binary Row Codec
//!
//! [`RowData`] holds one or more rows of table data inside a byte buffer
//! and provides both interpretation and construction of the binary row
//! structure. After [`RowData::prepare_row`] the row pointers frame the
//! first row in the buffer window; [`RowData::next_row`] walks subsequent
//! rows.
//!
//! ## Row Binary Layout
//!
//! ```text
//! +0      record length L (u32 LE, 18 <= L <= 8 MiB)
//! +4      signature bytes 'A','B'
//! +6      field count (u16 LE)
//! +8      row def id (i32 LE)
//! +12     null bitmap, one bit per field, LSB-first per byte
//! +..     fixed-length fields, schema order, non-null only
//! +..     variable-length offset slots, cumulative payload ends
//! +..     variable-length payloads, field order
//! +L-6    signature bytes 'B','A'
//! +L-4    record length L (u32 LE)
//! ```
//!
//! Null fields contribute zero body bytes. Each offset slot's width is the
//! minimum that can represent the sum of maximum storage sizes of every
//! variable field up to and including its own, so slot widths are a
//! function of the schema position alone, never of the stored values.
//!
//! ## Buffer Ownership
//!
//! A `RowData` owns its backing buffer but may expose only a window of it.
//! Construction can grow the buffer on overflow when the caller asks for
//! it; growth is only legal when the window covers the whole buffer, since
//! a windowed row is embedded in bytes shared with other rows.
//!
//! The hkey and the predecessor-difference segment are transient
//! annotations used by hkey-ordered operators; they are never part of the
//! binary image, but deep copies preserve them.

use std::fmt;

use eyre::{ensure, Result};
use zerocopy::little_endian::{I32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::encoding::bytes::{get_int, get_uint, put_uint, var_width};
use crate::encoding::field;
use crate::error::Error;
use crate::hkey::HKey;
use crate::rowdata::schema::{FieldLocation, RowDef};
use crate::types::Value;

pub const MINIMUM_ROW_SIZE: usize = 18;
pub const MAXIMUM_ROW_SIZE: usize = 8 * 1024 * 1024;
pub const ENVELOPE_HEADER_SIZE: usize = 12;
pub const ENVELOPE_TRAILER_SIZE: usize = 6;
pub const SIGNATURE_LEAD: [u8; 2] = *b"AB";
pub const SIGNATURE_TRAIL: [u8; 2] = *b"BA";
pub const CREATE_ROW_INITIAL_SIZE: usize = 500;

/// Fixed-length leading envelope of every row.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Clone, Copy, Debug)]
#[repr(C)]
pub struct RowHeader {
    length: U32,
    signature: [u8; 2],
    field_count: U16,
    row_def_id: I32,
}

impl RowHeader {
    #[inline]
    pub fn length(&self) -> u32 {
        self.length.get()
    }

    #[inline]
    pub fn field_count(&self) -> u16 {
        self.field_count.get()
    }

    #[inline]
    pub fn row_def_id(&self) -> i32 {
        self.row_def_id.get()
    }
}

pub struct RowData {
    bytes: Vec<u8>,
    buffer_start: usize,
    buffer_end: usize,
    row_start: usize,
    row_end: usize,
    hkey: Option<HKey>,
    differs_from_predecessor_at: Option<usize>,
}

impl RowData {
    /// Wraps a buffer whose window covers the whole allocation.
    pub fn new(bytes: Vec<u8>) -> Self {
        let buffer_end = bytes.len();
        Self {
            bytes,
            buffer_start: 0,
            buffer_end,
            row_start: 0,
            row_end: 0,
            hkey: None,
            differs_from_predecessor_at: None,
        }
    }

    /// Fresh zeroed buffer of the given capacity, for row construction.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(vec![0u8; capacity])
    }

    /// Wraps a window of a buffer that also holds unrelated bytes. Rows in
    /// a windowed buffer cannot grow.
    pub fn with_window(bytes: Vec<u8>, offset: usize, length: usize) -> Result<Self> {
        ensure!(
            offset + length <= bytes.len(),
            "window {}..{} exceeds buffer of {} bytes",
            offset,
            offset + length,
            bytes.len()
        );
        Ok(Self {
            bytes,
            buffer_start: offset,
            buffer_end: offset + length,
            row_start: offset,
            row_end: offset,
            hkey: None,
            differs_from_predecessor_at: None,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn buffer_start(&self) -> usize {
        self.buffer_start
    }

    pub fn buffer_end(&self) -> usize {
        self.buffer_end
    }

    pub fn row_start(&self) -> usize {
        self.row_start
    }

    pub fn row_end(&self) -> usize {
        self.row_end
    }

    pub fn row_size(&self) -> usize {
        self.row_end - self.row_start
    }

    /// Shrinks the buffer window to end at the last constructed row, so a
    /// buffer filled by repeated construction parses as a maximal row
    /// sequence.
    pub fn seal(&mut self) {
        self.buffer_end = self.row_end;
    }

    /// Positions construction of the next row immediately after the
    /// current one.
    pub fn begin_next_row(&mut self) {
        self.row_start = self.row_end;
    }

    fn header_at(&self, offset: usize) -> Result<RowHeader> {
        let end = offset + ENVELOPE_HEADER_SIZE;
        if end > self.bytes.len() {
            return Err(Error::corrupt(format!(
                "row header at offset {} overruns buffer of {} bytes",
                offset,
                self.bytes.len()
            )));
        }
        RowHeader::read_from_bytes(&self.bytes[offset..end])
            .map_err(|_| Error::corrupt("unreadable row header"))
    }

    pub fn field_count(&self) -> Result<u16> {
        Ok(self.header_at(self.row_start)?.field_count())
    }

    pub fn row_def_id(&self) -> Result<i32> {
        Ok(self.header_at(self.row_start)?.row_def_id())
    }

    /// Validates the envelope of the row at `offset` without moving the
    /// row pointers.
    pub fn validate_row(&self, offset: usize) -> Result<()> {
        if offset < self.buffer_start || offset + MINIMUM_ROW_SIZE > self.buffer_end {
            return Err(Error::corrupt(format!(
                "row offset {} does not fit buffer window {}..{}",
                offset, self.buffer_start, self.buffer_end
            )));
        }
        let header = self.header_at(offset)?;
        let length = header.length() as usize;
        if length < MINIMUM_ROW_SIZE {
            return Err(Error::corrupt(format!(
                "record length {} below minimum {} at offset {}",
                length, MINIMUM_ROW_SIZE, offset
            )));
        }
        if length > MAXIMUM_ROW_SIZE {
            return Err(Error::corrupt(format!(
                "record length {} above maximum {} at offset {}",
                length, MAXIMUM_ROW_SIZE, offset
            )));
        }
        if offset + length > self.buffer_end {
            return Err(Error::corrupt(format!(
                "record length {} at offset {} overruns buffer end {}",
                length, offset, self.buffer_end
            )));
        }
        if header.signature != SIGNATURE_LEAD {
            return Err(Error::corrupt(format!(
                "invalid leading signature at offset {}",
                offset
            )));
        }
        let trailing_length = get_uint(&self.bytes, offset + length - 4, 4)? as usize;
        if trailing_length != length {
            return Err(Error::corrupt(format!(
                "trailing record length {} does not match leading length {} at offset {}",
                trailing_length, length, offset
            )));
        }
        if self.bytes[offset + length - 6..offset + length - 4] != SIGNATURE_TRAIL {
            return Err(Error::corrupt(format!(
                "invalid trailing signature at offset {}",
                offset
            )));
        }
        let bitmap = RowDef::null_bitmap_size(header.field_count() as usize);
        if ENVELOPE_HEADER_SIZE + bitmap + ENVELOPE_TRAILER_SIZE > length {
            return Err(Error::corrupt(format!(
                "field count {} does not fit record length {} at offset {}",
                header.field_count(),
                length,
                offset
            )));
        }
        Ok(())
    }

    /// Frames the row at `offset`. Returns `false` exactly when `offset`
    /// is the buffer end; any other invalid offset is a corrupt row.
    pub fn prepare_row(&mut self, offset: usize) -> Result<bool> {
        if offset == self.buffer_end {
            return Ok(false);
        }
        self.validate_row(offset)?;
        let length = self.header_at(offset)?.length() as usize;
        self.row_start = offset;
        self.row_end = offset + length;
        Ok(true)
    }

    /// Advances to the next row in the buffer; `false` at the end of the
    /// window.
    pub fn next_row(&mut self) -> Result<bool> {
        if self.row_end < self.buffer_end {
            self.prepare_row(self.row_end)
        } else {
            Ok(false)
        }
    }

    pub fn is_null(&self, index: usize) -> Result<bool> {
        let field_count = self.field_count()? as usize;
        ensure!(
            index < field_count,
            "no field {} in row of {} fields",
            index,
            field_count
        );
        let byte = self.bytes[self.row_start + ENVELOPE_HEADER_SIZE + index / 8];
        Ok(byte & (1 << (index % 8)) != 0)
    }

    pub fn is_all_null(&self) -> Result<bool> {
        let field_count = self.field_count()? as usize;
        for index in 0..field_count {
            if !self.is_null(index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Reads an integer field at a resolved location, sign-extending when
    /// the schema declares the field signed.
    pub fn integer_value(&self, location: FieldLocation, signed: bool) -> Result<i64> {
        ensure!(
            location.offset >= self.row_start
                && location.offset + location.width <= self.row_end,
            "bad location: offset {} width {} outside row {}..{}",
            location.offset,
            location.width,
            self.row_start,
            self.row_end
        );
        if signed {
            get_int(&self.bytes, location.offset, location.width)
        } else {
            Ok(get_uint(&self.bytes, location.offset, location.width)? as i64)
        }
    }

    /// Decodes field `index` under `row_def`, yielding `Value::Null` for
    /// null fields.
    pub fn field_value(&self, row_def: &RowDef, index: usize) -> Result<Value<'static>> {
        let location = row_def.field_location(self, index)?;
        if location.is_null() {
            return Ok(Value::Null);
        }
        let field = row_def
            .field(index)
            .ok_or_else(|| eyre::eyre!("no field {} in row def {}", index, row_def.row_def_id()))?;
        field::decode(&field.field_type, &self.bytes, location.offset, location.width)
    }

    /// Builds a row from `values` at the current row start.
    ///
    /// `values` may be shorter than the schema; missing and `Null` entries
    /// set the corresponding null bits. With `grow` set, an overflowing
    /// buffer is replaced by a doubled one (starting at 500 bytes when
    /// empty) and construction retried; growth on a windowed buffer fails
    /// instead.
    pub fn create_row(&mut self, row_def: &RowDef, values: &[Value<'_>], grow: bool) -> Result<()> {
        if grow && !(self.buffer_start == 0 && self.buffer_end == self.bytes.len()) {
            return Err(Error::BufferImmutable.into());
        }
        if values.len() > row_def.field_count() {
            return Err(Error::encoding(format!(
                "{} values for a row def of {} fields",
                values.len(),
                row_def.field_count()
            )));
        }
        let needed = Self::required_size(row_def, values)?;
        if needed > MAXIMUM_ROW_SIZE {
            return Err(Error::encoding(format!(
                "row of {} bytes exceeds the {} byte maximum",
                needed, MAXIMUM_ROW_SIZE
            )));
        }
        if self.row_start + needed > self.buffer_end {
            if !grow {
                return Err(Error::encoding(format!(
                    "row of {} bytes overflows buffer of {} bytes",
                    needed,
                    self.buffer_end - self.row_start
                )));
            }
            let mut capacity = if self.bytes.is_empty() {
                CREATE_ROW_INITIAL_SIZE
            } else {
                self.bytes.len()
            };
            while self.row_start + needed > capacity {
                capacity *= 2;
            }
            self.bytes = vec![0u8; capacity];
            self.buffer_end = capacity;
        }
        self.write_row(row_def, values)
    }

    /// Exact byte size the row will occupy.
    fn required_size(row_def: &RowDef, values: &[Value<'_>]) -> Result<usize> {
        let field_count = row_def.field_count();
        let mut size = ENVELOPE_HEADER_SIZE
            + RowDef::null_bitmap_size(field_count)
            + ENVELOPE_TRAILER_SIZE;
        let mut cumulative_max = 0usize;
        for (index, field) in row_def.fields().iter().enumerate() {
            let value = values.get(index).filter(|v| !v.is_null());
            if let Some(width) = field.field_type.fixed_size() {
                if value.is_some() {
                    size += width;
                }
            } else {
                cumulative_max += field.max_storage_size();
                if let Some(value) = value {
                    size += var_width(cumulative_max);
                    size += field::encoded_width(&field.field_type, value)?;
                }
            }
        }
        Ok(size)
    }

    fn write_row(&mut self, row_def: &RowDef, values: &[Value<'_>]) -> Result<()> {
        let start = self.row_start;
        let field_count = row_def.field_count();

        let header = RowHeader {
            length: U32::new(0),
            signature: SIGNATURE_LEAD,
            field_count: U16::new(field_count as u16),
            row_def_id: I32::new(row_def.row_def_id()),
        };
        self.bytes[start..start + ENVELOPE_HEADER_SIZE].copy_from_slice(header.as_bytes());

        let mut offset = start + ENVELOPE_HEADER_SIZE;
        for byte_index in 0..RowDef::null_bitmap_size(field_count) {
            let mut byte = 0u8;
            for bit in 0..8 {
                let index = byte_index * 8 + bit;
                if index < field_count
                    && values.get(index).map(Value::is_null).unwrap_or(true)
                {
                    byte |= 1 << bit;
                }
            }
            self.bytes[offset] = byte;
            offset += 1;
        }

        for (index, fd) in row_def.fields().iter().enumerate() {
            if fd.is_fixed_size() {
                if let Some(value) = values.get(index).filter(|v| !v.is_null()) {
                    offset += field::encode(&fd.field_type, value, &mut self.bytes, offset)?;
                }
            }
        }

        let mut cumulative_max = 0usize;
        let mut running_length = 0u64;
        for (index, fd) in row_def.fields().iter().enumerate() {
            if !fd.is_fixed_size() {
                cumulative_max += fd.max_storage_size();
                if let Some(value) = values.get(index).filter(|v| !v.is_null()) {
                    running_length += field::encoded_width(&fd.field_type, value)? as u64;
                    let slot_width = var_width(cumulative_max);
                    if slot_width > 0 {
                        put_uint(&mut self.bytes, offset, slot_width, running_length)?;
                        offset += slot_width;
                    }
                }
            }
        }

        for (index, fd) in row_def.fields().iter().enumerate() {
            if !fd.is_fixed_size() {
                if let Some(value) = values.get(index).filter(|v| !v.is_null()) {
                    offset += field::encode(&fd.field_type, value, &mut self.bytes, offset)?;
                }
            }
        }

        self.bytes[offset..offset + 2].copy_from_slice(&SIGNATURE_TRAIL);
        offset += 2;
        let length = offset + 4 - start;
        put_uint(&mut self.bytes, offset, 4, length as u64)?;
        offset += 4;
        put_uint(&mut self.bytes, start, 4, length as u64)?;
        self.row_end = offset;
        Ok(())
    }

    /// Deep copy of the current row: a fresh buffer sized exactly to the
    /// row, with the hkey and predecessor-difference annotations carried
    /// over.
    pub fn copy(&self) -> Result<RowData> {
        let bytes = self.bytes[self.row_start..self.row_end].to_vec();
        let mut copy = RowData::new(bytes);
        copy.prepare_row(0)?;
        copy.hkey = self.hkey.clone();
        copy.differs_from_predecessor_at = self.differs_from_predecessor_at;
        Ok(copy)
    }

    /// Projection copy: a new row under `row_def` keeping only the fields
    /// whose entry in `null_map` (starting at `null_map_offset`) is false.
    /// Every kept field must be fixed-size and non-null in the source.
    pub fn copy_projection(
        &self,
        row_def: &RowDef,
        null_map: &[bool],
        null_map_offset: usize,
    ) -> Result<RowData> {
        let field_count = row_def.field_count();
        ensure!(
            null_map_offset + field_count <= null_map.len(),
            "null map of {} entries too short for {} fields at offset {}",
            null_map.len(),
            field_count,
            null_map_offset
        );

        let mut size =
            ENVELOPE_HEADER_SIZE + RowDef::null_bitmap_size(field_count) + ENVELOPE_TRAILER_SIZE;
        for (index, fd) in row_def.fields().iter().enumerate() {
            if !null_map[null_map_offset + index] {
                let width = fd.field_type.fixed_size().ok_or_else(|| {
                    Error::encoding(format!(
                        "variable-size field {} cannot be projected by copy",
                        index
                    ))
                })?;
                size += width;
            }
        }

        let mut out = RowData::with_capacity(size);
        let header = RowHeader {
            length: U32::new(size as u32),
            signature: SIGNATURE_LEAD,
            field_count: U16::new(field_count as u16),
            row_def_id: I32::new(row_def.row_def_id()),
        };
        out.bytes[..ENVELOPE_HEADER_SIZE].copy_from_slice(header.as_bytes());

        let mut offset = ENVELOPE_HEADER_SIZE;
        for byte_index in 0..RowDef::null_bitmap_size(field_count) {
            let mut byte = 0u8;
            for bit in 0..8 {
                let index = byte_index * 8 + bit;
                if index < field_count && null_map[null_map_offset + index] {
                    byte |= 1 << bit;
                }
            }
            out.bytes[offset] = byte;
            offset += 1;
        }

        for (index, _) in row_def.fields().iter().enumerate() {
            if !null_map[null_map_offset + index] {
                let location = row_def.field_location(self, index)?;
                if location.is_null() {
                    return Err(Error::encoding(format!(
                        "projected field {} is null in the source row",
                        index
                    )));
                }
                out.bytes[offset..offset + location.width].copy_from_slice(
                    &self.bytes[location.offset..location.offset + location.width],
                );
                offset += location.width;
            }
        }

        out.bytes[offset..offset + 2].copy_from_slice(&SIGNATURE_TRAIL);
        offset += 2;
        put_uint(&mut out.bytes, offset, 4, size as u64)?;
        out.row_end = size;
        Ok(out)
    }

    /// Smallest buffer that holds a row of `row_def` with every field
    /// null: the envelope plus the null bitmap.
    pub fn null_row_buffer_size(row_def: &RowDef) -> usize {
        MINIMUM_ROW_SIZE + RowDef::null_bitmap_size(row_def.field_count())
    }

    pub fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_ref()
    }

    pub fn set_hkey(&mut self, hkey: Option<HKey>) {
        self.hkey = hkey;
    }

    /// Hkey segment at which this row's key first differed from its
    /// predecessor in an hkey-ordered sequence. Transient: never part of
    /// the binary image.
    pub fn differs_from_predecessor_at(&self) -> Option<usize> {
        self.differs_from_predecessor_at
    }

    pub fn set_differs_from_predecessor_at(&mut self, segment: Option<usize>) {
        self.differs_from_predecessor_at = segment;
    }
}

impl fmt::Debug for RowData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snippet_end = self.row_end.min(self.row_start + 64).min(self.bytes.len());
        let snippet = &self.bytes[self.row_start.min(snippet_end)..snippet_end];
        write!(
            f,
            "RowData {{ window: {}..{}, row: {}..{}, bytes:",
            self.buffer_start, self.buffer_end, self.row_start, self.row_end
        )?;
        for b in snippet {
            write!(f, " {:02x}", b)?;
        }
        write!(f, " }}")
    }
}
