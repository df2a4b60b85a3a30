use serde::Deserialize;

use crate::error::Result;
use crate::schema::{ColumnInfo, MetadataProvider, ResultSchema};

/// Wire format tag of a statement result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultFormat {
    JsonArray,
    ArrowStream,
    Csv,
    ColumnBasedSet,
    RowBasedSet,
    ArrowBasedSet,
    UrlBasedSet,
    #[serde(other)]
    Unknown,
}

impl ResultFormat {
    pub fn name(self) -> &'static str {
        match self {
            ResultFormat::JsonArray => "JSON_ARRAY",
            ResultFormat::ArrowStream => "ARROW_STREAM",
            ResultFormat::Csv => "CSV",
            ResultFormat::ColumnBasedSet => "COLUMN_BASED_SET",
            ResultFormat::RowBasedSet => "ROW_BASED_SET",
            ResultFormat::ArrowBasedSet => "ARROW_BASED_SET",
            ResultFormat::UrlBasedSet => "URL_BASED_SET",
            ResultFormat::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes a statement result: format, schema, and sizes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultManifest {
    #[serde(default)]
    pub format: Option<ResultFormat>,
    #[serde(default)]
    pub schema: ResultSchema,
    #[serde(default)]
    pub total_row_count: Option<u64>,
    #[serde(default)]
    pub total_chunk_count: Option<u64>,
    /// Result describes a file transfer to run against a volume.
    #[serde(default)]
    pub is_volume_operation: bool,
}

impl ResultManifest {
    pub fn new(format: ResultFormat, columns: Vec<ColumnInfo>) -> Self {
        Self {
            format: Some(format),
            schema: ResultSchema { column_count: Some(columns.len()), columns },
            total_row_count: None,
            total_chunk_count: None,
            is_volume_operation: false,
        }
    }

    pub fn with_total_rows(mut self, rows: u64) -> Self {
        self.total_row_count = Some(rows);
        self
    }
}

impl MetadataProvider for ResultManifest {
    fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    fn column(&self, index: usize) -> Result<&ColumnInfo> {
        self.schema.column(index)
    }

    fn resolve_label(&self, label: &str) -> Option<usize> {
        self.schema.resolve_label(label)
    }

    fn total_rows(&self) -> Option<u64> {
        self.total_row_count
    }
}

/// Kind of statement that produced a result; drives update-count handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementType {
    #[default]
    None,
    Query,
    Sql,
    Update,
    Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_statement_execution_json() {
        let manifest: ResultManifest = serde_json::from_str(
            r#"{
                "format": "JSON_ARRAY",
                "schema": {"column_count": 1, "columns": [{"name": "n", "type_text": "INT", "type_name": "INT", "position": 0}]},
                "total_row_count": 2,
                "total_chunk_count": 1,
                "truncated": false
            }"#,
        )
        .expect("valid manifest");
        assert_eq!(manifest.format, Some(ResultFormat::JsonArray));
        assert_eq!(manifest.total_rows(), Some(2));
        assert_eq!(manifest.column_count(), 1);
        assert!(!manifest.is_volume_operation);
    }

    #[test]
    fn unknown_format_tag_is_kept_as_unknown() {
        let manifest: ResultManifest =
            serde_json::from_str(r#"{"format": "PARQUET"}"#).expect("valid manifest");
        assert_eq!(manifest.format, Some(ResultFormat::Unknown));
    }
}
