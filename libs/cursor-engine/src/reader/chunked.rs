use std::collections::VecDeque;

use tokio::sync::mpsc;

use cursor_api::{BackendReader, ChunkProvider, ColumnarChunk, CursorError, RawValue, Result};

/// Streams rows out of columnar chunks pulled on demand.
pub struct ChunkedReader {
    provider: Box<dyn ChunkProvider>,
    chunk: Option<ColumnarChunk>,
    row_in_chunk: usize,
    current: i64,
    total_rows: Option<u64>,
    exhausted: bool,
    closed: bool,
}

impl ChunkedReader {
    pub fn new(provider: Box<dyn ChunkProvider>, total_rows: Option<u64>) -> Self {
        Self {
            provider,
            chunk: None,
            row_in_chunk: 0,
            current: -1,
            total_rows,
            exhausted: false,
            closed: false,
        }
    }
}

impl BackendReader for ChunkedReader {
    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        if self.exhausted {
            return Ok(false);
        }
        if let Some(chunk) = &self.chunk {
            if self.row_in_chunk + 1 < chunk.row_count() {
                self.row_in_chunk += 1;
                self.current += 1;
                return Ok(true);
            }
        }
        loop {
            match self.provider.next_chunk()? {
                Some(chunk) if chunk.row_count() == 0 => {
                    tracing::trace!(delivered = self.provider.chunks_delivered(), "skipping empty chunk");
                }
                Some(chunk) => {
                    tracing::debug!(
                        rows = chunk.row_count(),
                        delivered = self.provider.chunks_delivered(),
                        total = self.provider.chunk_count(),
                        "loaded result chunk"
                    );
                    self.chunk = Some(chunk);
                    self.row_in_chunk = 0;
                    self.current += 1;
                    return Ok(true);
                }
                None => {
                    self.chunk = None;
                    self.exhausted = true;
                    return Ok(false);
                }
            }
        }
    }

    fn current_row_index(&self) -> i64 {
        self.current
    }

    fn raw_value(&self, column: usize) -> Result<RawValue> {
        if self.closed {
            return Err(CursorError::Closed);
        }
        let chunk = self
            .chunk
            .as_ref()
            .ok_or_else(|| CursorError::InvalidState("no current row".into()))?;
        if column >= chunk.column_count() {
            return Err(CursorError::InvalidColumn { index: column + 1, count: chunk.column_count() });
        }
        Ok(chunk.value(self.row_in_chunk, column).cloned().unwrap_or(RawValue::Null))
    }

    fn has_next(&self) -> bool {
        if self.closed || self.exhausted {
            return false;
        }
        let more_in_chunk = self
            .chunk
            .as_ref()
            .is_some_and(|chunk| self.row_in_chunk + 1 < chunk.row_count());
        more_in_chunk || self.provider.chunks_delivered() < self.provider.chunk_count()
    }

    fn row_count(&self) -> Option<u64> {
        self.total_rows
    }

    fn chunk_count(&self) -> u64 {
        self.provider.chunk_count()
    }

    fn close(&mut self) {
        self.provider.close();
        self.chunk = None;
        self.closed = true;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Chunk providers
// ═══════════════════════════════════════════════════════════════

/// Chunks already in memory.
pub struct InlineChunkProvider {
    chunks: VecDeque<ColumnarChunk>,
    total: u64,
    delivered: u64,
}

impl InlineChunkProvider {
    pub fn new(chunks: Vec<ColumnarChunk>) -> Self {
        Self { total: chunks.len() as u64, chunks: chunks.into(), delivered: 0 }
    }
}

impl ChunkProvider for InlineChunkProvider {
    fn next_chunk(&mut self) -> Result<Option<ColumnarChunk>> {
        let chunk = self.chunks.pop_front();
        if chunk.is_some() {
            self.delivered += 1;
        }
        Ok(chunk)
    }

    fn chunk_count(&self) -> u64 {
        self.total
    }

    fn chunks_delivered(&self) -> u64 {
        self.delivered
    }

    fn close(&mut self) {
        self.chunks.clear();
    }
}

/// Producer half of [`chunk_channel`]; an error ends the stream with that error.
pub type ChunkSender = mpsc::Sender<Result<ColumnarChunk>>;

/// Chunks delivered by an external downloader through a bounded channel.
///
/// `next_chunk` blocks the calling thread, so the reader must not be driven
/// from inside an async task.
pub struct ChannelChunkProvider {
    rx: mpsc::Receiver<Result<ColumnarChunk>>,
    total: u64,
    delivered: u64,
}

/// Bounded chunk channel for a result announced with `chunk_count` chunks.
pub fn chunk_channel(buffer: usize, chunk_count: u64) -> (ChunkSender, ChannelChunkProvider) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, ChannelChunkProvider { rx, total: chunk_count, delivered: 0 })
}

impl ChunkProvider for ChannelChunkProvider {
    fn next_chunk(&mut self) -> Result<Option<ColumnarChunk>> {
        match self.rx.blocking_recv() {
            Some(Ok(chunk)) => {
                self.delivered += 1;
                Ok(Some(chunk))
            }
            Some(Err(e)) => Err(e.with_context(format!("chunk {}", self.delivered))),
            None if self.delivered < self.total => Err(CursorError::InvalidState(format!(
                "chunk stream ended after {} of {} chunks",
                self.delivered, self.total
            ))),
            None => Ok(None),
        }
    }

    fn chunk_count(&self) -> u64 {
        self.total
    }

    fn chunks_delivered(&self) -> u64 {
        self.delivered
    }

    fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(values: &[i64]) -> ColumnarChunk {
        ColumnarChunk::new(vec![values.iter().map(|v| RawValue::Int(*v)).collect()])
    }

    fn drain(reader: &mut ChunkedReader) -> Vec<RawValue> {
        let mut seen = Vec::new();
        while reader.advance().expect("advance") {
            seen.push(reader.raw_value(0).expect("cell"));
        }
        seen
    }

    #[test]
    fn rows_span_chunks_and_skip_empty_ones() {
        let provider = InlineChunkProvider::new(vec![chunk(&[1, 2]), chunk(&[]), chunk(&[3])]);
        let mut reader = ChunkedReader::new(Box::new(provider), Some(3));
        assert!(reader.has_next());
        assert_eq!(drain(&mut reader), vec![RawValue::Int(1), RawValue::Int(2), RawValue::Int(3)]);
        assert_eq!(reader.current_row_index(), 2);
        assert!(!reader.has_next());
        assert!(!reader.advance().expect("still exhausted"));
    }

    #[test]
    fn channel_feeds_reader_from_another_thread() {
        let (tx, provider) = chunk_channel(1, 3);
        let producer = std::thread::spawn(move || {
            for values in [[1, 2], [3, 4], [5, 6]] {
                tx.blocking_send(Ok(chunk(&values))).expect("reader alive");
            }
        });
        let mut reader = ChunkedReader::new(Box::new(provider), Some(6));
        assert_eq!(drain(&mut reader).len(), 6);
        assert_eq!(reader.chunk_count(), 3);
        producer.join().expect("producer finished");
    }

    #[test]
    fn producer_error_surfaces_on_advance() {
        let (tx, provider) = chunk_channel(4, 2);
        tx.blocking_send(Ok(chunk(&[1]))).expect("queued");
        tx.blocking_send(Err(CursorError::InvalidState("link expired".into()))).expect("queued");
        drop(tx);
        let mut reader = ChunkedReader::new(Box::new(provider), None);
        assert!(reader.advance().expect("first chunk"));
        let err = reader.advance().expect_err("download failure");
        assert!(err.to_string().contains("link expired"));
    }

    #[test]
    fn early_end_of_stream_is_an_error() {
        let (tx, provider) = chunk_channel(4, 2);
        tx.blocking_send(Ok(chunk(&[1]))).expect("queued");
        drop(tx);
        let mut reader = ChunkedReader::new(Box::new(provider), None);
        assert!(reader.advance().expect("first chunk"));
        assert!(matches!(reader.advance(), Err(CursorError::InvalidState(_))));
    }
}
