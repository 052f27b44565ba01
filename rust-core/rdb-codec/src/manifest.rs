// SPDX-License-Identifier: PMPL-1.0-or-later
//
// RDB Codec - Schema manifests
//
// JSON documents describing a record structure. A manifest lists the data
// cells (and optionally a custom header) in on-disk order:
//
// ```json
// {
//   "name": "ItemList",
//   "table_name": "ItemData",
//   "special_case": "none",
//   "cells": [
//     { "name": "Id",    "type": "int32", "flags": ["loop_counter"] },
//     { "name": "Name",  "type": "string", "length": 32 },
//     { "name": "Flags", "type": "bit_vector", "flags": ["hidden"] },
//     { "name": "Rare",  "type": "bit_from_vector", "dependency": "Flags", "offset": 0 }
//   ]
// }
// ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cell::WireType;
use crate::descriptor::{CellDescriptor, CellFlags};
use crate::error::RdbResult;
use crate::record::{RecordSchema, SpecialCase, StructureInfo};
use crate::value::TextEncoding;

/// Flag names accepted in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellFlag {
    Hidden,
    RowCount,
    RdbIgnore,
    SqlIgnore,
    LoopCounter,
}

impl From<CellFlag> for CellFlags {
    fn from(flag: CellFlag) -> Self {
        match flag {
            CellFlag::Hidden => CellFlags::HIDDEN,
            CellFlag::RowCount => CellFlags::ROW_COUNT,
            CellFlag::RdbIgnore => CellFlags::RDB_IGNORE,
            CellFlag::SqlIgnore => CellFlags::SQL_IGNORE,
            CellFlag::LoopCounter => CellFlags::LOOP_COUNTER,
        }
    }
}

/// One cell entry of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub wire_type: WireType,
    /// Width in bytes. Ignored for strings whose width comes from a
    /// dependency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    /// Bit position for bit vector members.
    #[serde(default, alias = "bit_offset", skip_serializing_if = "Option::is_none")]
    pub offset: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<CellFlag>,
}

impl CellManifest {
    pub fn to_descriptor(&self) -> CellDescriptor {
        let mut cell = CellDescriptor::new(&self.name, self.wire_type);
        if let Some(length) = self.length {
            if !self.wire_type.is_dependent_length() {
                cell = cell.with_length(length);
            }
        }
        if let Some(dependency) = &self.dependency {
            cell = cell.with_dependency(dependency);
        }
        if let Some(offset) = self.offset {
            cell = cell.with_bit_offset(offset);
        }
        let flags = self
            .flags
            .iter()
            .fold(CellFlags::NONE, |acc, &flag| acc | CellFlags::from(flag));
        cell.with_flags(flags)
    }
}

/// A complete record structure document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaManifest {
    #[serde(flatten)]
    pub info: StructureInfo,
    #[serde(default)]
    pub encoding: TextEncoding,
    #[serde(default)]
    pub special_case: SpecialCase,
    /// Custom header cells; the default 3-cell header when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<CellManifest>>,
    pub cells: Vec<CellManifest>,
}

impl SchemaManifest {
    pub fn from_json_str(json: &str) -> RdbResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> RdbResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate the manifest into a schema.
    pub fn into_schema(self) -> RdbResult<RecordSchema> {
        let mut builder = RecordSchema::builder(
            self.cells.iter().map(CellManifest::to_descriptor).collect(),
        )
        .info(self.info)
        .special_case(self.special_case)
        .encoding(self.encoding);
        if let Some(header) = &self.header {
            builder = builder.header(header.iter().map(CellManifest::to_descriptor).collect());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const ITEMS: &str = r#"{
        "name": "ItemList",
        "author": "tools",
        "version": "1.2",
        "file_name": "item.rdb",
        "table_name": "ItemData",
        "encoding": "latin1",
        "special_case": "double_loop",
        "cells": [
            { "name": "Group", "type": "int32", "flags": ["loop_counter", "sql_ignore"] },
            { "name": "NameLen", "type": "string_len" },
            { "name": "Name", "type": "string_by_len", "dependency": "NameLen", "length": 99 },
            { "name": "Flags", "type": "bit_vector", "flags": ["hidden"] },
            { "name": "Rare", "type": "bit_from_vector", "dependency": "Flags", "bit_offset": 3 },
            { "name": "Pad", "type": "skip", "length": 2 }
        ]
    }"#;

    #[test]
    fn test_manifest_builds_schema() {
        let manifest = SchemaManifest::from_json_str(ITEMS).unwrap();
        assert_eq!(manifest.info.table_name.as_deref(), Some("ItemData"));
        let schema = manifest.into_schema().unwrap();
        assert_eq!(schema.special_case(), SpecialCase::GroupedRows);
        assert_eq!(schema.encoding(), TextEncoding::Latin1);
        assert_eq!(schema.info().file_name, "item.rdb");

        let data = schema.data_layout();
        assert_eq!(data.len(), 6);
        let group = data.descriptor("Group").unwrap();
        assert!(group.has_flag(CellFlags::LOOP_COUNTER | CellFlags::SQL_IGNORE));
        assert_eq!(data.descriptor("NameLen").unwrap().wire_type(), WireType::Int);
        assert_eq!(data.descriptor("Name").unwrap().fixed_length(), None);
        assert_eq!(data.descriptor("Rare").unwrap().bit_offset(), 3);
        assert_eq!(schema.header_layout().len(), 3);
    }

    #[test]
    fn test_custom_header() {
        let json = r#"{
            "header": [
                { "name": "Count", "type": "int", "flags": ["row_count"] },
                { "name": "TitleLen", "type": "short" }
            ],
            "cells": [
                { "name": "Title", "type": "string_by_header_ref", "dependency": "TitleLen" }
            ]
        }"#;
        let schema = SchemaManifest::from_json_str(json).unwrap().into_schema().unwrap();
        assert_eq!(schema.header_layout().len(), 2);
    }

    #[test]
    fn test_unknown_type_is_manifest_error() {
        let json = r#"{ "cells": [ { "name": "X", "type": "quaternion" } ] }"#;
        let error = SchemaManifest::from_json_str(json).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_invalid_layout_is_schema_error() {
        let json = r#"{ "cells": [ { "name": "Name", "type": "string" } ] }"#;
        let error = SchemaManifest::from_json_str(json)
            .unwrap()
            .into_schema()
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Schema);
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, ITEMS).unwrap();
        let manifest = SchemaManifest::from_path(&path).unwrap();
        assert_eq!(manifest.cells.len(), 6);
        assert!(SchemaManifest::from_path(dir.path().join("missing.json")).is_err());
    }
}
