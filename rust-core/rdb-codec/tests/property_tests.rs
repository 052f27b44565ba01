// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the RDB codec

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rdb_codec::{
    restore, scramble, ByteReader, ByteWriter, CellDescriptor, CellFlags, Decimal, Record,
    RecordSchema, SequenceGenerator, TextEncoding, Value, WireType,
};

/// Generate arbitrary dates that fit yyyyMMdd
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1i32..=9999, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

/// Generate arbitrary short names
fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _]{0,15}"
}

/// Generate one data row worth of values
fn arb_row() -> impl Strategy<Value = (i32, String, i32, NaiveDate, bool, bool)> {
    (any::<i32>(), arb_name(), any::<i32>(), arb_date(), any::<bool>(), any::<bool>())
}

fn item_schema() -> Arc<RecordSchema> {
    Arc::new(
        RecordSchema::new(vec![
            CellDescriptor::new("Id", WireType::EncodedInt),
            CellDescriptor::fixed_string("Name", 16),
            CellDescriptor::new("Price", WireType::Decimal),
            CellDescriptor::new("Added", WireType::DateString),
            CellDescriptor::new("Flags", WireType::BitVector).with_flags(CellFlags::HIDDEN),
            CellDescriptor::bit("Tradable", "Flags", 0),
            CellDescriptor::bit("Quest", "Flags", 5),
        ])
        .unwrap(),
    )
}

proptest! {
    #[test]
    fn test_restore_inverts_scramble(x in any::<u32>()) {
        prop_assert_eq!(restore(scramble(x)), x);
        prop_assert_eq!(scramble(restore(x)), x);
    }

    #[test]
    fn test_scramble_preserves_bit_count(x in any::<u32>()) {
        prop_assert_eq!(scramble(x).count_ones(), x.count_ones());
    }

    #[test]
    fn test_scramble_is_injective(a in any::<u32>(), b in any::<u32>()) {
        prop_assume!(a != b);
        prop_assert_ne!(scramble(a), scramble(b));
        prop_assert_ne!(restore(a), restore(b));
    }

    #[test]
    fn test_fixed_string_roundtrip_consumes_width(text in arb_name(), extra in 1usize..8) {
        let width = text.len() + extra;
        let mut writer = ByteWriter::new();
        rdb_codec::cell::encode(
            WireType::FixedString, width, &Value::from(text.as_str()), &mut writer, "s", TextEncoding::Utf8,
        ).unwrap();
        prop_assert_eq!(writer.position(), width);

        let bytes = writer.into_inner();
        let mut reader = ByteReader::new(&bytes);
        let decoded = rdb_codec::cell::decode(
            WireType::FixedString, width, &mut reader, "s", TextEncoding::Utf8,
        ).unwrap();
        prop_assert_eq!(decoded, Value::Text(text));
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn test_record_roundtrip(rows in prop::collection::vec(arb_row(), 0..20)) {
        let schema = item_schema();
        let mut record = Record::new(Arc::clone(&schema));
        for (id, name, cents, added, tradable, quest) in &rows {
            let mut row = record.new_row();
            row.set("Id", *id).unwrap();
            row.set("Name", name.as_str()).unwrap();
            row.set("Price", Decimal::from_hundredths(i64::from(*cents))).unwrap();
            row.set("Added", Value::Date(*added)).unwrap();
            row.set("Flags", 0).unwrap();
            row.set("Tradable", Value::Byte(u8::from(*tradable))).unwrap();
            row.set("Quest", Value::Byte(u8::from(*quest))).unwrap();
            record.push_row(row).unwrap();
        }
        record.sync_row_count().unwrap();
        let bytes = record.write().unwrap();
        prop_assert_eq!(bytes.len(), 132 + rows.len() * 36);

        let reread = Record::read(schema, &bytes, &mut SequenceGenerator::new()).unwrap();
        prop_assert_eq!(reread.rows(), record.rows());
        prop_assert_eq!(reread.header(), record.header());
    }
}
