//! # Row Schema
//!
//! [`RowDef`] is the static description of a table row: an ordered list of
//! [`FieldDef`]s plus the row-def identifier stamped into every row's
//! envelope. The schema owns layout resolution: [`RowDef::field_location`]
//! walks a parsed row and answers where a field's bytes live.
//!
//! The post-null-map region of a row is laid out fixed fields first, then
//! the variable-offset table, then variable payloads. Null fields of either
//! class contribute zero body bytes, so a field's position depends on which
//! of its predecessors are null in that particular row.

use eyre::{ensure, Result};

use crate::encoding::bytes::{get_uint, var_width};
use crate::encoding::field::FieldType;
use crate::error::Error;
use crate::rowdata::row::{RowData, ENVELOPE_HEADER_SIZE, ENVELOPE_TRAILER_SIZE};

/// Definition of one field in a row.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }

    pub fn is_fixed_size(&self) -> bool {
        !self.field_type.is_variable()
    }

    pub fn max_storage_size(&self) -> usize {
        self.field_type.max_storage_size()
    }
}

/// Static schema of a row: ordered field definitions plus the identifier
/// carried in each row's envelope.
#[derive(Debug, Clone)]
pub struct RowDef {
    row_def_id: i32,
    fields: Vec<FieldDef>,
}

/// Packed location of a field inside a row's buffer. Both components are
/// zero exactly when the field is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLocation {
    pub offset: usize,
    pub width: usize,
}

impl FieldLocation {
    pub const NULL: FieldLocation = FieldLocation {
        offset: 0,
        width: 0,
    };

    pub fn is_null(&self) -> bool {
        self.offset == 0 && self.width == 0
    }
}

impl RowDef {
    pub fn new(row_def_id: i32, fields: Vec<FieldDef>) -> Self {
        Self { row_def_id, fields }
    }

    pub fn row_def_id(&self) -> i32 {
        self.row_def_id
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, index: usize) -> Option<&FieldDef> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn null_bitmap_size(field_count: usize) -> usize {
        field_count.div_ceil(8)
    }

    /// Byte offset of the row body (first fixed field) relative to the row
    /// start.
    pub fn body_offset(&self) -> usize {
        ENVELOPE_HEADER_SIZE + Self::null_bitmap_size(self.fields.len())
    }

    /// Resolves the buffer location of field `index` inside `row`.
    ///
    /// Returns [`FieldLocation::NULL`] for null fields. Fails with a corrupt
    /// row report when the row's field count disagrees with this schema or
    /// a variable-length offset points outside the row.
    pub fn field_location(&self, row: &RowData, index: usize) -> Result<FieldLocation> {
        ensure!(
            index < self.fields.len(),
            "no field {} in row def {}",
            index,
            self.row_def_id
        );
        let field_count = row.field_count()? as usize;
        if field_count != self.fields.len() {
            return Err(Error::corrupt(format!(
                "row carries {} fields but row def {} declares {}",
                field_count,
                self.row_def_id,
                self.fields.len()
            )));
        }
        if row.is_null(index)? {
            return Ok(FieldLocation::NULL);
        }

        let mut cursor = row.row_start() + self.body_offset();
        let mut fixed_target = None;
        for (j, field) in self.fields.iter().enumerate() {
            if let Some(width) = field.field_type.fixed_size() {
                if !row.is_null(j)? {
                    if j == index {
                        fixed_target = Some((cursor, width));
                    }
                    cursor += width;
                }
            }
        }
        if let Some((offset, width)) = fixed_target {
            return Ok(FieldLocation { offset, width });
        }

        // Offset slots store cumulative payload ends; the slot width grows
        // with the worst-case payload of every variable field so far,
        // including null ones.
        let mut cumulative_max = 0usize;
        let mut slot_cursor = cursor;
        let mut previous_end = 0u64;
        let mut bounds = None;
        for (j, field) in self.fields.iter().enumerate() {
            if field.field_type.is_variable() {
                cumulative_max += field.max_storage_size();
                if !row.is_null(j)? {
                    let slot_width = var_width(cumulative_max);
                    let end = if slot_width == 0 {
                        previous_end
                    } else {
                        get_uint(row.bytes(), slot_cursor, slot_width)?
                    };
                    if j == index {
                        bounds = Some((previous_end, end));
                    }
                    previous_end = end;
                    slot_cursor += slot_width;
                }
            }
        }
        let payload_base = slot_cursor;
        let (start, end) = bounds.ok_or_else(|| {
            Error::corrupt(format!(
                "no offset slot for variable field {} of row def {}",
                index, self.row_def_id
            ))
        })?;
        if end < start {
            return Err(Error::corrupt(format!(
                "variable field {} has end offset {} before start {}",
                index, end, start
            )));
        }
        let offset = payload_base + start as usize;
        let width = (end - start) as usize;
        if offset + width + ENVELOPE_TRAILER_SIZE > row.row_end() {
            return Err(Error::corrupt(format!(
                "variable field {} of {} bytes at offset {} overruns row end {}",
                index, width, offset, row.row_end()
            )));
        }
        Ok(FieldLocation { offset, width })
    }
}
