use crate::error::Result;
use crate::value::RawValue;

/// Pull-based row source behind a cursor.
///
/// Implementations are driven by one consumer at a time. Any internal
/// parallelism (remote chunk downloads) stays behind `advance`.
pub trait BackendReader: Send {
    /// Move to the next row. Returns `false` once the rows are exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// 0-based index of the current row, `-1` before the first `advance`.
    fn current_row_index(&self) -> i64;

    /// Raw value of a 0-based column in the current row.
    fn raw_value(&self, column: usize) -> Result<RawValue>;

    /// Whether another `advance` may still yield a row.
    fn has_next(&self) -> bool;

    /// Total rows, when known.
    fn row_count(&self) -> Option<u64>;

    fn chunk_count(&self) -> u64 {
        0
    }

    /// Release held resources. Called exactly once by the owning cursor.
    fn close(&mut self);
}

/// Column-major block of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnarChunk {
    columns: Vec<Vec<RawValue>>,
}

impl ColumnarChunk {
    pub fn new(columns: Vec<Vec<RawValue>>) -> Self {
        Self { columns }
    }

    /// Build a chunk from row-major data.
    pub fn from_rows(rows: Vec<Vec<RawValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut columns: Vec<Vec<RawValue>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for row in rows {
            let mut cells = row.into_iter();
            for column in columns.iter_mut() {
                column.push(cells.next().unwrap_or(RawValue::Null));
            }
        }
        Self { columns }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&RawValue> {
        self.columns.get(column).and_then(|c| c.get(row))
    }
}

/// Source of result chunks, typically fed by a remote downloader.
pub trait ChunkProvider: Send {
    /// Next chunk in result order, `None` when all chunks were delivered.
    fn next_chunk(&mut self) -> Result<Option<ColumnarChunk>>;

    /// Chunks announced for the result.
    fn chunk_count(&self) -> u64;

    /// Chunks handed out so far.
    fn chunks_delivered(&self) -> u64;

    fn close(&mut self);
}

// ═══════════════════════════════════════════════════════════════
//  Volume transfer
// ═══════════════════════════════════════════════════════════════

/// File transfer described by a volume-operation result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// `GET`, `PUT`, `REMOVE`, ...
    pub operation: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub local_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl TransferStatus {
    pub fn name(self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Running => "RUNNING",
            TransferStatus::Succeeded => "SUCCEEDED",
            TransferStatus::Failed => "FAILED",
            TransferStatus::Aborted => "ABORTED",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, TransferStatus::Failed | TransferStatus::Aborted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub status: TransferStatus,
    pub message: String,
}

/// Executes volume file transfers on behalf of the status reader.
pub trait VolumeTransfer: Send + Sync {
    fn execute(&self, request: &TransferRequest) -> TransferOutcome;
}
