use std::fmt;

/// Container kind of a complex SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexKind {
    Array,
    Struct,
    Map,
}

impl ComplexKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ComplexKind::Array => "ARRAY",
            ComplexKind::Struct => "STRUCT",
            ComplexKind::Map => "MAP",
        }
    }

    /// Stable code reported when the accessor for this kind is disabled.
    pub fn disabled_code(self) -> &'static str {
        match self {
            ComplexKind::Array => "COMPLEX_ARRAY_DISABLED",
            ComplexKind::Struct => "COMPLEX_STRUCT_DISABLED",
            ComplexKind::Map => "COMPLEX_MAP_DISABLED",
        }
    }
}

impl fmt::Display for ComplexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Coarse error category, for callers that branch on the class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Grammar,
    Shape,
    Conversion,
    Unsupported,
    Closed,
    NotFound,
    State,
    Transfer,
    Config,
}

#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    #[error("invalid {category} metadata: {metadata}")]
    Grammar { category: ComplexKind, metadata: String },

    #[error("expected {expected} for {kind} but found: {found}")]
    ShapeMismatch {
        kind: ComplexKind,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot convert '{value}' to {target}: {detail}")]
    Conversion {
        value: String,
        target: String,
        detail: String,
    },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not supported: {0}")]
    Unsupported(String),

    #[error(
        "complex datatype support is disabled, cannot read {0} column; \
         set `complex_datatype_support = true` [{code}]",
        code = .0.disabled_code()
    )]
    ComplexTypeDisabled(ComplexKind),

    #[error("column {column} is not of type {expected} (declared {actual})")]
    ColumnTypeMismatch {
        column: usize,
        expected: ComplexKind,
        actual: String,
    },

    #[error("operation not allowed: cursor is closed")]
    Closed,

    #[error("column label not found: {0}")]
    LabelNotFound(String),

    #[error("invalid column index {index} (result has {count} columns)")]
    InvalidColumn { index: usize, count: usize },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("volume operation {status}: {message}")]
    TransferFailed { status: String, message: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("{context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<CursorError>,
    },
}

impl CursorError {
    pub fn conversion(
        value: impl fmt::Display,
        target: impl Into<String>,
        detail: impl fmt::Display,
    ) -> Self {
        CursorError::Conversion {
            value: value.to_string(),
            target: target.into(),
            detail: detail.to_string(),
        }
    }

    pub fn unsupported(what: impl Into<String>) -> Self {
        CursorError::Unsupported(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CursorError::Grammar { .. } => ErrorKind::Grammar,
            CursorError::ShapeMismatch { .. } => ErrorKind::Shape,
            CursorError::Conversion { .. } | CursorError::Json(_) => ErrorKind::Conversion,
            CursorError::Unsupported(_) | CursorError::ComplexTypeDisabled(_) => {
                ErrorKind::Unsupported
            }
            CursorError::ColumnTypeMismatch { .. } => ErrorKind::Conversion,
            CursorError::Closed => ErrorKind::Closed,
            CursorError::LabelNotFound(_) | CursorError::InvalidColumn { .. } => {
                ErrorKind::NotFound
            }
            CursorError::InvalidState(_) => ErrorKind::State,
            CursorError::TransferFailed { .. } => ErrorKind::Transfer,
            CursorError::Config(_) => ErrorKind::Config,
            CursorError::Nested { source, .. } => source.kind(),
        }
    }

    /// Innermost error, skipping any context layers.
    pub fn root(&self) -> &CursorError {
        match self {
            CursorError::Nested { source, .. } => source.root(),
            other => other,
        }
    }

    /// Add context to the error.
    ///
    /// Message-only variants get the context prepended in place; structured
    /// variants are wrapped so their fields stay matchable through [`root`](Self::root).
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            CursorError::Config(msg) => CursorError::Config(format!("{ctx}: {msg}")),
            CursorError::InvalidState(msg) => CursorError::InvalidState(format!("{ctx}: {msg}")),
            other => CursorError::Nested {
                context: ctx.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type Result<T, E = CursorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_context_keeps_kind_and_root() {
        let err = CursorError::ShapeMismatch {
            kind: ComplexKind::Array,
            expected: "a sequence",
            found: "integer",
        }
        .with_context("element 2")
        .with_context("field \"b\"");

        assert_eq!(err.kind(), ErrorKind::Shape);
        assert!(matches!(err.root(), CursorError::ShapeMismatch { kind: ComplexKind::Array, .. }));
        assert_eq!(
            err.to_string(),
            "field \"b\": element 2: expected a sequence for ARRAY but found: integer"
        );
    }

    #[test]
    fn disabled_error_names_container_kind() {
        let array = CursorError::ComplexTypeDisabled(ComplexKind::Array).to_string();
        let map = CursorError::ComplexTypeDisabled(ComplexKind::Map).to_string();
        assert!(array.contains("ARRAY") && array.contains("COMPLEX_ARRAY_DISABLED"));
        assert!(map.contains("MAP") && map.contains("COMPLEX_MAP_DISABLED"));
        assert_ne!(array, map);
    }

    #[test]
    fn config_context_is_prepended() {
        let err = CursorError::Config("missing field".into()).with_context("cursor.toml");
        assert_eq!(err.to_string(), "config error: cursor.toml: missing field");
    }
}
