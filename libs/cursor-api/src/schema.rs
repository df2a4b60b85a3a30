use serde::Deserialize;

use crate::error::{CursorError, Result};
use crate::types::SqlType;

/// One column of a result schema, as reported by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Full type descriptor, e.g. `ARRAY<STRUCT<a:INT>>`.
    #[serde(default)]
    pub type_text: Option<String>,
    /// Bare type keyword, e.g. `ARRAY`.
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub type_precision: Option<u32>,
    #[serde(default)]
    pub type_scale: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, type_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_text: Some(type_text.into()),
            type_name: None,
            position: None,
            type_precision: None,
            type_scale: None,
            nullable: true,
        }
    }

    pub fn with_scale(mut self, precision: u32, scale: u32) -> Self {
        self.type_precision = Some(precision);
        self.type_scale = Some(scale);
        self
    }

    pub fn sql_type(&self) -> SqlType {
        match (&self.type_name, &self.type_text) {
            (Some(name), _) => SqlType::from_type_name(name),
            (None, Some(text)) => SqlType::from_type_name(text),
            (None, None) => SqlType::Other,
        }
    }

    /// Descriptor text used for conversion; falls back to the type name.
    pub fn descriptor(&self) -> &str {
        self.type_text
            .as_deref()
            .or(self.type_name.as_deref())
            .unwrap_or("STRING")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResultSchema {
    #[serde(default)]
    pub column_count: Option<usize>,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

/// Read-only column metadata consulted by the cursor. Indices are 1-based.
pub trait MetadataProvider: Send + Sync {
    fn column_count(&self) -> usize;

    fn column(&self, index: usize) -> Result<&ColumnInfo>;

    fn column_name(&self, index: usize) -> Result<&str> {
        Ok(&self.column(index)?.name)
    }

    fn column_sql_type(&self, index: usize) -> Result<SqlType> {
        Ok(self.column(index)?.sql_type())
    }

    fn column_type_text(&self, index: usize) -> Result<&str> {
        Ok(self.column(index)?.descriptor())
    }

    fn column_precision(&self, index: usize) -> Result<Option<u32>> {
        Ok(self.column(index)?.type_precision)
    }

    fn column_scale(&self, index: usize) -> Result<Option<u32>> {
        Ok(self.column(index)?.type_scale)
    }

    fn column_nullable(&self, index: usize) -> Result<bool> {
        Ok(self.column(index)?.nullable)
    }

    /// Case-insensitive label lookup; the first matching column wins.
    fn resolve_label(&self, label: &str) -> Option<usize>;

    /// Total rows of the result, when known up front.
    fn total_rows(&self) -> Option<u64> {
        None
    }
}

impl MetadataProvider for ResultSchema {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, index: usize) -> Result<&ColumnInfo> {
        index
            .checked_sub(1)
            .and_then(|i| self.columns.get(i))
            .ok_or(CursorError::InvalidColumn { index, count: self.columns.len() })
    }

    /// Unicode case folding via lowercase, so `ÉTAT` finds `état`.
    fn resolve_label(&self, label: &str) -> Option<usize> {
        let label = label.to_lowercase();
        self.columns
            .iter()
            .position(|c| c.name.to_lowercase() == label)
            .map(|i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ResultSchema {
        ResultSchema {
            column_count: Some(3),
            columns: vec![
                ColumnInfo::new("id", "BIGINT"),
                ColumnInfo::new("Amount", "DECIMAL(10,2)").with_scale(10, 2),
                ColumnInfo::new("AMOUNT", "STRING"),
            ],
        }
    }

    #[test]
    fn label_lookup_is_case_insensitive_first_match() {
        let schema = schema();
        assert_eq!(schema.resolve_label("amount"), Some(2));
        assert_eq!(schema.resolve_label("ID"), Some(1));
        assert_eq!(schema.resolve_label("missing"), None);
    }

    #[test]
    fn label_lookup_folds_non_ascii_case() {
        let schema = ResultSchema {
            column_count: Some(2),
            columns: vec![ColumnInfo::new("état", "STRING"), ColumnInfo::new("Größe", "INT")],
        };
        assert_eq!(schema.resolve_label("ÉTAT"), Some(1));
        assert_eq!(schema.resolve_label("GRÖßE"), Some(2));
        assert_eq!(schema.resolve_label("größe"), Some(2));
    }

    #[test]
    fn column_index_is_one_based() {
        let schema = schema();
        assert_eq!(schema.column_sql_type(2).expect("column 2"), SqlType::Decimal);
        assert_eq!(schema.column_scale(2).expect("column 2"), Some(2));
        assert!(matches!(
            schema.column(0),
            Err(CursorError::InvalidColumn { index: 0, count: 3 })
        ));
        assert!(schema.column(4).is_err());
    }

    #[test]
    fn type_name_takes_precedence_over_text() {
        let column: ColumnInfo = serde_json::from_str(
            r#"{"name":"tags","type_text":"ARRAY<STRING>","type_name":"ARRAY","position":0}"#,
        )
        .expect("valid column");
        assert_eq!(column.sql_type(), SqlType::Array);
        assert_eq!(column.descriptor(), "ARRAY<STRING>");
        assert!(column.nullable);
    }
}
