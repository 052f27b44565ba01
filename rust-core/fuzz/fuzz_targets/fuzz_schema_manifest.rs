// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for schema manifests.
// Run with: cargo +nightly fuzz run fuzz_schema_manifest
//
// Arbitrary JSON must either be rejected or produce a schema whose empty
// record can be written and read back.

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use rdb_codec::{Record, SchemaManifest, SequenceGenerator};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if input.len() > 4096 {
        return;
    }
    let Ok(manifest) = SchemaManifest::from_json_str(input) else {
        return;
    };
    let Ok(schema) = manifest.into_schema() else {
        return;
    };

    let mut record = Record::new(Arc::new(schema));
    if let Ok(bytes) = record.write() {
        let mut sequence = SequenceGenerator::new();
        let _ = Record::read(Arc::clone(record.schema()), &bytes, &mut sequence);
    }
});
