//! Tests for the row codec

use std::borrow::Cow;

use super::row::{
    ENVELOPE_HEADER_SIZE, MAXIMUM_ROW_SIZE, MINIMUM_ROW_SIZE, SIGNATURE_LEAD, SIGNATURE_TRAIL,
};
use super::*;
use crate::encoding::{Charset, FieldType};
use crate::error::{is_kind, Error};
use crate::hkey::{HKey, KeySegment};
use crate::types::Value;

fn int32() -> FieldType {
    FieldType::Int {
        width: 4,
        signed: true,
    }
}

fn varchar(max_chars: u32) -> FieldType {
    FieldType::Varchar {
        max_chars,
        charset: Charset::Utf8,
    }
}

fn two_field_def() -> RowDef {
    RowDef::new(
        7,
        vec![
            FieldDef::new("a", int32()),
            FieldDef::new("b", varchar(16)),
        ],
    )
}

#[test]
fn two_rows_in_one_buffer_traverse_in_order() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(4096);
    row.create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap();
    row.begin_next_row();
    row.create_row(&row_def, &[Value::Int(2), Value::Null], false)
        .unwrap();
    row.seal();

    assert!(row.prepare_row(0).unwrap());
    assert!(!row.is_null(1).unwrap());
    let loc = row_def.field_location(&row, 0).unwrap();
    assert_eq!(row.integer_value(loc, true).unwrap(), 1);
    assert_eq!(row.field_value(&row_def, 1).unwrap(), Value::from("x"));

    assert!(row.next_row().unwrap());
    assert!(row.is_null(1).unwrap());
    let loc = row_def.field_location(&row, 0).unwrap();
    assert_eq!(row.integer_value(loc, true).unwrap(), 2);
    assert_eq!(row.field_value(&row_def, 1).unwrap(), Value::Null);

    assert!(!row.next_row().unwrap());
}

#[test]
fn round_trip_across_field_types() {
    let row_def = RowDef::new(
        3,
        vec![
            FieldDef::new("flag", FieldType::Bool),
            FieldDef::new("small", FieldType::Int { width: 2, signed: true }),
            FieldDef::new("wide", FieldType::Int { width: 8, signed: false }),
            FieldDef::new("ratio", FieldType::Float8),
            FieldDef::new("day", FieldType::Date),
            FieldDef::new("at", FieldType::Timestamp),
            FieldDef::new("name", varchar(10)),
            FieldDef::new("price", FieldType::Decimal),
            FieldDef::new("payload", FieldType::Varbinary { max_bytes: 8 }),
        ],
    );
    let values = vec![
        Value::Bool(true),
        Value::Int(-321),
        Value::Int(1 << 40),
        Value::Float(2.5),
        Value::Date(19_000),
        Value::Timestamp(1_700_000_000_000_000),
        Value::from("abc"),
        Value::Decimal {
            digits: -1999,
            scale: 2,
        },
        Value::Binary(Cow::Borrowed(&[1, 2, 3])),
    ];

    let mut row = RowData::with_capacity(512);
    row.create_row(&row_def, &values, false).unwrap();
    row.seal();
    assert!(row.prepare_row(0).unwrap());

    for (index, expected) in values.iter().enumerate() {
        assert_eq!(
            &row.field_value(&row_def, index).unwrap(),
            expected,
            "field {}",
            index
        );
    }
}

#[test]
fn absent_tail_values_promote_to_null() {
    let row_def = RowDef::new(
        4,
        vec![
            FieldDef::new("a", int32()),
            FieldDef::new("b", int32()),
            FieldDef::new("c", varchar(4)),
        ],
    );
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &[Value::Int(9)], false).unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    assert!(!row.is_null(0).unwrap());
    assert!(row.is_null(1).unwrap());
    assert!(row.is_null(2).unwrap());
    assert_eq!(row.field_value(&row_def, 1).unwrap(), Value::Null);
    assert!(!row.is_all_null().unwrap());
}

#[test]
fn an_all_null_row_occupies_the_minimum_buffer() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(64);
    row.create_row(&row_def, &[], false).unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    assert!(row.is_all_null().unwrap());
    assert_eq!(row.row_size(), RowData::null_row_buffer_size(&row_def));
}

#[test]
fn envelope_carries_matching_lengths_and_signatures() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &[Value::Int(5), Value::from("hello")], false)
        .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    let bytes = row.bytes();
    let size = row.row_size();
    let leading = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let trailing = u32::from_le_bytes(bytes[size - 4..size].try_into().unwrap()) as usize;
    assert_eq!(leading, size);
    assert_eq!(trailing, size);
    assert!(size >= MINIMUM_ROW_SIZE && size <= MAXIMUM_ROW_SIZE);
    assert_eq!(bytes[4..6], SIGNATURE_LEAD);
    assert_eq!(bytes[size - 6..size - 4], SIGNATURE_TRAIL);
}

#[test]
fn null_bit_matches_zero_width_location() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &[Value::Null, Value::from("zz")], false)
        .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    assert!(row.is_null(0).unwrap());
    let loc = row_def.field_location(&row, 0).unwrap();
    assert!(loc.is_null());
    assert_eq!(loc, FieldLocation::NULL);

    assert!(!row.is_null(1).unwrap());
    let loc = row_def.field_location(&row, 1).unwrap();
    assert!(!loc.is_null());
    assert_eq!(loc.width, 2);
}

#[test]
fn copy_preserves_bytes_and_transient_annotations() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();
    row.set_hkey(Some(HKey::from_segments([
        KeySegment::Ordinal(1),
        KeySegment::Int(1),
    ])));
    row.set_differs_from_predecessor_at(Some(1));

    let copy = row.copy().unwrap();
    assert_eq!(
        copy.bytes(),
        &row.bytes()[row.row_start()..row.row_end()]
    );
    assert_eq!(copy.row_size(), row.row_size());
    assert_eq!(copy.hkey(), row.hkey());
    assert_eq!(copy.differs_from_predecessor_at(), Some(1));
}

#[test]
fn corrupting_the_envelope_fails_parse() {
    let row_def = two_field_def();
    let mut built = RowData::with_capacity(256);
    built
        .create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap();
    built.seal();
    built.prepare_row(0).unwrap();
    let size = built.row_size();
    let pristine = built.bytes()[..size].to_vec();

    // Leading length, both signatures and the trailing length all live in
    // fixed positions; flipping any of their bytes must fail validation.
    let mut targets: Vec<usize> = (0..6).collect();
    targets.extend(size - 6..size);
    for target in targets {
        let mut bytes = pristine.clone();
        bytes[target] ^= 0xFF;
        let mut corrupt = RowData::new(bytes);
        let err = corrupt.prepare_row(0).unwrap_err();
        assert!(
            is_kind(&err, &Error::CorruptRow(String::new())),
            "byte {} flip produced {:?}",
            target,
            err
        );
    }
}

#[test]
fn field_count_mismatch_is_detected_at_field_access() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    let wider = RowDef::new(
        7,
        vec![
            FieldDef::new("a", int32()),
            FieldDef::new("b", varchar(16)),
            FieldDef::new("c", int32()),
        ],
    );
    let err = wider.field_location(&row, 0).unwrap_err();
    assert!(is_kind(&err, &Error::CorruptRow(String::new())));
}

#[test]
fn trailing_junk_after_last_row_fails_parse() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(4096);
    row.create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap();
    // Window left at 4096: the zero padding after the row is junk.
    row.prepare_row(0).unwrap();
    let err = row.next_row().unwrap_err();
    assert!(is_kind(&err, &Error::CorruptRow(String::new())));
}

#[test]
fn offset_slot_widths_follow_cumulative_maximums() {
    // First slot must hold up to 200 bytes (1 byte wide), the second up to
    // 200 + 60000 (2 bytes), the third up to 200 + 60000 + 70000 (3 bytes).
    let row_def = RowDef::new(
        11,
        vec![
            FieldDef::new("a", FieldType::Varbinary { max_bytes: 200 }),
            FieldDef::new("b", FieldType::Varbinary { max_bytes: 60_000 }),
            FieldDef::new("c", FieldType::Varbinary { max_bytes: 70_000 }),
        ],
    );
    let a = vec![0xAAu8; 150];
    let b = vec![0xBBu8; 50_000];
    let c = vec![0xCCu8; 65_000];
    let values = vec![
        Value::Binary(Cow::Borrowed(&a)),
        Value::Binary(Cow::Borrowed(&b)),
        Value::Binary(Cow::Borrowed(&c)),
    ];

    let mut row = RowData::new(Vec::new());
    row.create_row(&row_def, &values, true).unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    let body = ENVELOPE_HEADER_SIZE + 1;
    let slot_bytes = 1 + 2 + 3;
    let loc_a = row_def.field_location(&row, 0).unwrap();
    assert_eq!(loc_a.offset, body + slot_bytes);
    assert_eq!(loc_a.width, 150);
    let loc_b = row_def.field_location(&row, 1).unwrap();
    assert_eq!(loc_b.offset, loc_a.offset + 150);
    assert_eq!(loc_b.width, 50_000);
    let loc_c = row_def.field_location(&row, 2).unwrap();
    assert_eq!(loc_c.offset, loc_b.offset + 50_000);
    assert_eq!(loc_c.width, 65_000);

    for (index, expected) in values.iter().enumerate() {
        assert_eq!(&row.field_value(&row_def, index).unwrap(), expected);
    }
}

#[test]
fn null_variable_fields_still_widen_later_slots() {
    // The first field is null; the second field's slot width must still
    // account for the first field's 300-byte maximum.
    let row_def = RowDef::new(
        12,
        vec![
            FieldDef::new("a", FieldType::Varbinary { max_bytes: 300 }),
            FieldDef::new("b", FieldType::Varbinary { max_bytes: 10 }),
        ],
    );
    let payload = vec![0x5Au8; 10];
    let mut row = RowData::with_capacity(256);
    row.create_row(
        &row_def,
        &[Value::Null, Value::Binary(Cow::Borrowed(&payload))],
        false,
    )
    .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    // One null-map byte, then a single two-byte slot for field b.
    let loc = row_def.field_location(&row, 1).unwrap();
    assert_eq!(loc.offset, ENVELOPE_HEADER_SIZE + 1 + 2);
    assert_eq!(loc.width, 10);
    assert_eq!(
        row.field_value(&row_def, 1).unwrap(),
        Value::Binary(Cow::Borrowed(&payload[..]))
    );
}

#[test]
fn growth_starts_small_and_doubles_until_the_row_fits() {
    let row_def = two_field_def();
    let mut row = RowData::new(Vec::new());
    row.create_row(&row_def, &[Value::Int(1), Value::from("x")], true)
        .unwrap();
    assert_eq!(row.bytes().len(), 500);

    let big = RowDef::new(
        13,
        vec![FieldDef::new("blob", FieldType::Varbinary { max_bytes: 2000 })],
    );
    let payload = vec![9u8; 1400];
    row.create_row(&big, &[Value::Binary(Cow::Borrowed(&payload))], true)
        .unwrap();
    assert_eq!(row.bytes().len(), 2000);
}

#[test]
fn overflow_without_growth_is_an_encoding_error() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(8);
    let err = row
        .create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap_err();
    assert!(is_kind(&err, &Error::Encoding(String::new())));
}

#[test]
fn growth_of_an_embedded_buffer_is_refused() {
    let row_def = two_field_def();
    let mut row = RowData::with_window(vec![0u8; 64], 8, 16).unwrap();
    let err = row
        .create_row(&row_def, &[Value::Int(1), Value::from("x")], true)
        .unwrap_err();
    assert!(is_kind(&err, &Error::BufferImmutable));
}

#[test]
fn oversized_variable_value_is_an_encoding_error() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(4096);
    let err = row
        .create_row(
            &row_def,
            &[Value::Int(1), Value::from("seventeen chars!!")],
            false,
        )
        .unwrap_err();
    assert!(is_kind(&err, &Error::Encoding(String::new())));
}

#[test]
fn too_many_values_is_an_encoding_error() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(256);
    let err = row
        .create_row(
            &row_def,
            &[Value::Int(1), Value::Null, Value::Int(3)],
            false,
        )
        .unwrap_err();
    assert!(is_kind(&err, &Error::Encoding(String::new())));
}

#[test]
fn projection_copy_keeps_selected_fixed_fields() {
    let row_def = RowDef::new(
        20,
        vec![
            FieldDef::new("a", int32()),
            FieldDef::new("b", int32()),
            FieldDef::new("c", int32()),
        ],
    );
    let mut row = RowData::with_capacity(256);
    row.create_row(
        &row_def,
        &[Value::Int(10), Value::Int(20), Value::Int(30)],
        false,
    )
    .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    // Keep a and c, drop b.
    let projected = row
        .copy_projection(&row_def, &[false, true, false], 0)
        .unwrap();
    assert_eq!(projected.field_value(&row_def, 0).unwrap(), Value::Int(10));
    assert_eq!(projected.field_value(&row_def, 1).unwrap(), Value::Null);
    assert_eq!(projected.field_value(&row_def, 2).unwrap(), Value::Int(30));
}

#[test]
fn projection_copy_rejects_variable_fields() {
    let row_def = two_field_def();
    let mut row = RowData::with_capacity(256);
    row.create_row(&row_def, &[Value::Int(1), Value::from("x")], false)
        .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();

    let err = row
        .copy_projection(&row_def, &[false, false], 0)
        .unwrap_err();
    assert!(is_kind(&err, &Error::Encoding(String::new())));
}

#[test]
fn unsigned_fields_read_without_sign_extension() {
    let row_def = RowDef::new(
        21,
        vec![FieldDef::new(
            "u",
            FieldType::Int {
                width: 2,
                signed: false,
            },
        )],
    );
    let mut row = RowData::with_capacity(64);
    row.create_row(&row_def, &[Value::Int(0xFFFE)], false)
        .unwrap();
    row.seal();
    row.prepare_row(0).unwrap();
    let loc = row_def.field_location(&row, 0).unwrap();
    assert_eq!(row.integer_value(loc, false).unwrap(), 0xFFFE);
    assert_eq!(row.integer_value(loc, true).unwrap(), -2);
}
