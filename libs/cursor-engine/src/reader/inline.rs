use cursor_api::{BackendReader, CursorError, RawValue, Result};

/// Reader over rows already held in memory.
pub struct InlineReader {
    rows: Vec<Vec<RawValue>>,
    column_count: usize,
    current: i64,
    closed: bool,
}

impl InlineReader {
    pub fn new(rows: Vec<Vec<RawValue>>, column_count: usize) -> Self {
        Self { rows, column_count, current: -1, closed: false }
    }

    /// Build from column-major data, as sent by column-based result sets.
    pub fn from_columns(columns: Vec<Vec<RawValue>>) -> Self {
        let column_count = columns.len();
        let row_count = columns.iter().map(Vec::len).max().unwrap_or(0);
        let mut rows: Vec<Vec<RawValue>> = (0..row_count).map(|_| Vec::with_capacity(column_count)).collect();
        for column in columns {
            let mut cells = column.into_iter();
            for row in rows.iter_mut() {
                row.push(cells.next().unwrap_or(RawValue::Null));
            }
        }
        Self::new(rows, column_count)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed { Err(CursorError::Closed) } else { Ok(()) }
    }
}

impl BackendReader for InlineReader {
    /// Stays on the last row once the rows run out.
    fn advance(&mut self) -> Result<bool> {
        self.check_open()?;
        if self.has_next() {
            self.current += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn current_row_index(&self) -> i64 {
        self.current
    }

    fn raw_value(&self, column: usize) -> Result<RawValue> {
        self.check_open()?;
        let row = usize::try_from(self.current)
            .ok()
            .and_then(|i| self.rows.get(i))
            .ok_or_else(|| CursorError::InvalidState("cursor is before the first row".into()))?;
        if column >= self.column_count {
            return Err(CursorError::InvalidColumn { index: column + 1, count: self.column_count });
        }
        Ok(row.get(column).cloned().unwrap_or(RawValue::Null))
    }

    fn has_next(&self) -> bool {
        !self.closed && self.current + 1 < self.rows.len() as i64
    }

    fn row_count(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn close(&mut self) {
        self.rows = Vec::new();
        self.closed = true;
    }
}
