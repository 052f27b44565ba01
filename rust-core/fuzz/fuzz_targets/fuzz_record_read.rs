// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for record decoding.
// Run with: cargo +nightly fuzz run fuzz_record_read
//
// Feeds arbitrary file images to `Record::read` under a schema that uses
// every dependency-driven cell kind. Decoding must fail with an error, never
// panic, and anything that decodes must encode again.

#![no_main]

use std::sync::{Arc, OnceLock};

use libfuzzer_sys::fuzz_target;
use rdb_codec::{
    CellDescriptor, CellFlags, Record, RecordSchema, SequenceGenerator, SpecialCase, WireType,
};

fn schema(special_case: SpecialCase) -> Arc<RecordSchema> {
    let cells = vec![
        CellDescriptor::new("Group", WireType::Int).with_flags(CellFlags::LOOP_COUNTER),
        CellDescriptor::new("Seq", WireType::SequenceId),
        CellDescriptor::new("Code", WireType::EncodedInt),
        CellDescriptor::new("NameLen", WireType::Short),
        CellDescriptor::length_string("Name", "NameLen"),
        CellDescriptor::new("Flags", WireType::BitVector),
        CellDescriptor::bit("Low", "Flags", 0),
        CellDescriptor::bit("High", "Flags", 31),
        CellDescriptor::copy_int32("GroupCopy", "Group"),
        CellDescriptor::new("Added", WireType::DateString),
        CellDescriptor::new("Seen", WireType::DateTime),
        CellDescriptor::header_length_string("Note", "NoteLen"),
    ];
    let header = vec![
        CellDescriptor::new("RowCount", WireType::Int).with_flags(CellFlags::ROW_COUNT),
        CellDescriptor::new("NoteLen", WireType::Byte),
    ];
    let schema = RecordSchema::builder(cells)
        .header(header)
        .special_case(special_case)
        .build();
    match schema {
        Ok(schema) => Arc::new(schema),
        Err(error) => panic!("fuzz schema is invalid: {error}"),
    }
}

fuzz_target!(|data: &[u8]| {
    static SCHEMAS: OnceLock<[Arc<RecordSchema>; 2]> = OnceLock::new();
    let schemas = SCHEMAS.get_or_init(|| [schema(SpecialCase::None), schema(SpecialCase::GroupedRows)]);

    // Limit input size to keep iterations fast.
    if data.len() > 1 << 16 {
        return;
    }

    for schema in schemas {
        let mut sequence = SequenceGenerator::new();
        if let Ok(mut record) = Record::read(Arc::clone(schema), data, &mut sequence) {
            // Strings that decoded lossily may not fit again; only panics matter.
            let _ = record.write();
        }
    }
});
