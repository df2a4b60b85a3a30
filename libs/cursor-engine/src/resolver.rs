use std::sync::Arc;

use cursor_api::{
    BackendReader, ChunkProvider, ColumnarChunk, CursorConfig, CursorError, MetadataProvider,
    RawValue, Result, ResultFormat, ResultManifest, VolumeTransfer,
};

use crate::reader::{ChunkedReader, InlineChunkProvider, InlineReader, VolumeStatusReader};

/// Result data accompanying a manifest.
pub enum ResultPayload {
    /// Row-major inline data.
    Rows(Vec<Vec<RawValue>>),
    /// Column-major inline data.
    Columns(Vec<Vec<RawValue>>),
    /// Remote chunks, pulled on demand.
    Chunks(Box<dyn ChunkProvider>),
}

impl ResultPayload {
    /// Rows of a `data_array` JSON response.
    pub fn from_json_rows(rows: Vec<Vec<serde_json::Value>>) -> Self {
        ResultPayload::Rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(RawValue::from).collect())
                .collect(),
        )
    }

    fn kind_name(&self) -> &'static str {
        match self {
            ResultPayload::Rows(_) => "row",
            ResultPayload::Columns(_) => "column",
            ResultPayload::Chunks(_) => "chunk",
        }
    }
}

/// Picks the backend reader for a statement result.
#[derive(Clone, Default)]
pub struct ResultResolver {
    volume_operations: bool,
    transfer: Option<Arc<dyn VolumeTransfer>>,
}

impl ResultResolver {
    pub fn new(config: &CursorConfig) -> Self {
        Self { volume_operations: config.enable_volume_operations, transfer: None }
    }

    pub fn with_volume_transfer(mut self, transfer: Arc<dyn VolumeTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Build the reader matching the manifest's format tag.
    ///
    /// Unsupported or missing formats are errors; there is no fallback.
    pub fn resolve(&self, manifest: &ResultManifest, payload: ResultPayload) -> Result<Box<dyn BackendReader>> {
        let format = manifest
            .format
            .ok_or_else(|| CursorError::unsupported("result manifest carries no format"))?;
        let column_count = manifest.column_count();

        let reader: Box<dyn BackendReader> = match (format, payload) {
            (ResultFormat::RowBasedSet | ResultFormat::Csv | ResultFormat::Unknown, _) => {
                return Err(CursorError::unsupported(format!("result format {format}")));
            }
            (ResultFormat::JsonArray | ResultFormat::ColumnBasedSet, ResultPayload::Rows(rows)) => {
                Box::new(InlineReader::new(rows, column_count))
            }
            (ResultFormat::JsonArray | ResultFormat::ColumnBasedSet, ResultPayload::Columns(columns)) => {
                Box::new(InlineReader::from_columns(columns))
            }
            (
                ResultFormat::ArrowStream | ResultFormat::ArrowBasedSet | ResultFormat::UrlBasedSet,
                ResultPayload::Chunks(provider),
            ) => Box::new(ChunkedReader::new(provider, manifest.total_row_count)),
            (
                ResultFormat::ArrowStream | ResultFormat::ArrowBasedSet | ResultFormat::UrlBasedSet,
                ResultPayload::Rows(rows),
            ) => {
                let provider = InlineChunkProvider::new(vec![ColumnarChunk::from_rows(rows)]);
                Box::new(ChunkedReader::new(Box::new(provider), manifest.total_row_count))
            }
            (
                ResultFormat::ArrowStream | ResultFormat::ArrowBasedSet | ResultFormat::UrlBasedSet,
                ResultPayload::Columns(columns),
            ) => {
                let provider = InlineChunkProvider::new(vec![ColumnarChunk::new(columns)]);
                Box::new(ChunkedReader::new(Box::new(provider), manifest.total_row_count))
            }
            (format, payload) => {
                return Err(CursorError::InvalidState(format!(
                    "{} payload does not match result format {format}",
                    payload.kind_name()
                )));
            }
        };

        tracing::info!(
            %format,
            columns = column_count,
            rows = ?manifest.total_row_count,
            volume = manifest.is_volume_operation,
            "resolved result reader"
        );

        if !manifest.is_volume_operation {
            return Ok(reader);
        }
        if !self.volume_operations {
            return Err(CursorError::unsupported("volume operations are disabled"));
        }
        let transfer = self
            .transfer
            .clone()
            .ok_or_else(|| CursorError::unsupported("volume operation without a transfer handler"))?;
        Ok(Box::new(VolumeStatusReader::new(reader, manifest, transfer)?))
    }
}
