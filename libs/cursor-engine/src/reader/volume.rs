use std::sync::Arc;

use cursor_api::{
    BackendReader, CursorError, MetadataProvider, RawValue, Result, ResultManifest, TransferRequest,
    TransferStatus, VolumeTransfer,
};

const OPERATION: usize = 0;
const PRESIGNED_URL: usize = 1;
const HEADERS: usize = 2;
const LOCAL_FILE: usize = 3;

/// Single-column status reader for volume file-transfer results.
///
/// The inner row describes the transfer; advancing runs it through the
/// [`VolumeTransfer`] handler and exposes the resulting status name as
/// column 0.
pub struct VolumeStatusReader {
    inner: Box<dyn BackendReader>,
    transfer: Arc<dyn VolumeTransfer>,
    column_count: usize,
    status: Option<TransferStatus>,
    finished: bool,
}

impl VolumeStatusReader {
    pub fn new(
        inner: Box<dyn BackendReader>,
        manifest: &ResultManifest,
        transfer: Arc<dyn VolumeTransfer>,
    ) -> Result<Self> {
        let rows = manifest.total_rows().unwrap_or(1);
        if rows > 1 {
            return Err(CursorError::InvalidState(format!(
                "volume operation result has {rows} rows, expected at most 1"
            )));
        }
        let column_count = manifest.column_count();
        if !(3..=4).contains(&column_count) {
            return Err(CursorError::InvalidState(format!(
                "volume operation result has {column_count} columns, expected 3 or 4"
            )));
        }
        Ok(Self { inner, transfer, column_count, status: None, finished: false })
    }

    fn request(&self) -> Result<TransferRequest> {
        let text = |column: usize| -> Result<Option<String>> {
            Ok(self.inner.raw_value(column)?.leaf_text())
        };
        let operation = text(OPERATION)?
            .ok_or_else(|| CursorError::InvalidState("volume operation type is missing".into()))?;
        let url = text(PRESIGNED_URL)?
            .ok_or_else(|| CursorError::InvalidState("volume operation url is missing".into()))?;
        let headers = parse_headers(&self.inner.raw_value(HEADERS)?)?;
        let local_file = if self.column_count > LOCAL_FILE { text(LOCAL_FILE)? } else { None };
        Ok(TransferRequest { operation: operation.to_ascii_uppercase(), url, headers, local_file })
    }
}

/// Headers arrive as JSON object text, possibly wrapped in a list.
fn parse_headers(raw: &RawValue) -> Result<Vec<(String, String)>> {
    let decoded = match raw {
        RawValue::Null => return Ok(Vec::new()),
        RawValue::Text(s) if s.trim().is_empty() => return Ok(Vec::new()),
        RawValue::Text(s) => RawValue::from(serde_json::from_str::<serde_json::Value>(s)?),
        other => other.clone(),
    };
    let mut headers = Vec::new();
    collect_headers(&decoded, &mut headers)?;
    Ok(headers)
}

fn collect_headers(value: &RawValue, out: &mut Vec<(String, String)>) -> Result<()> {
    match value {
        RawValue::Mapping(entries) => {
            for (k, v) in entries {
                if let (Some(name), Some(value)) = (k.leaf_text(), v.leaf_text()) {
                    out.push((name, value));
                }
            }
            Ok(())
        }
        RawValue::Seq(items) => items.iter().try_for_each(|item| collect_headers(item, out)),
        RawValue::Null => Ok(()),
        other => Err(CursorError::conversion(other.kind_name(), "volume headers", "expected a JSON object")),
    }
}

impl BackendReader for VolumeStatusReader {
    fn advance(&mut self) -> Result<bool> {
        if self.finished || !self.inner.advance()? {
            self.finished = true;
            return Ok(false);
        }
        self.finished = true;
        let request = self.request()?;
        tracing::info!(operation = %request.operation, local_file = ?request.local_file, "running volume operation");
        let outcome = self.transfer.execute(&request);
        if outcome.status.is_failure() {
            tracing::error!(status = outcome.status.name(), message = %outcome.message, "volume operation failed");
            return Err(CursorError::TransferFailed {
                status: outcome.status.name().to_string(),
                message: outcome.message,
            });
        }
        self.status = Some(outcome.status);
        Ok(true)
    }

    fn current_row_index(&self) -> i64 {
        if self.status.is_some() { 0 } else { -1 }
    }

    fn raw_value(&self, column: usize) -> Result<RawValue> {
        if column != 0 {
            return Err(CursorError::InvalidColumn { index: column + 1, count: 1 });
        }
        self.status
            .map(|status| RawValue::text(status.name()))
            .ok_or_else(|| CursorError::InvalidState("volume operation has not run".into()))
    }

    fn has_next(&self) -> bool {
        !self.finished && self.inner.has_next()
    }

    fn row_count(&self) -> Option<u64> {
        Some(1)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use cursor_api::{ColumnInfo, ResultFormat, TransferOutcome};

    use crate::reader::InlineReader;

    struct Recording {
        status: TransferStatus,
        seen: Mutex<Vec<TransferRequest>>,
    }

    impl VolumeTransfer for Recording {
        fn execute(&self, request: &TransferRequest) -> TransferOutcome {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.clone());
            }
            TransferOutcome { status: self.status, message: "done".into() }
        }
    }

    fn manifest(columns: usize) -> ResultManifest {
        let names = ["operation", "presignedUrl", "headers", "localFile", "extra"];
        ResultManifest::new(
            ResultFormat::JsonArray,
            names[..columns].iter().map(|n| ColumnInfo::new(*n, "STRING")).collect(),
        )
        .with_total_rows(1)
    }

    fn row() -> Box<dyn BackendReader> {
        Box::new(InlineReader::new(
            vec![vec![
                RawValue::text("put"),
                RawValue::text("https://volume.example/upload"),
                RawValue::text(r#"[{"x-ms-blob-type":"BlockBlob"}]"#),
                RawValue::text("/tmp/data.csv"),
            ]],
            4,
        ))
    }

    #[test]
    fn successful_transfer_reports_status() {
        let transfer = Arc::new(Recording { status: TransferStatus::Succeeded, seen: Mutex::new(Vec::new()) });
        let mut reader = VolumeStatusReader::new(row(), &manifest(4), transfer.clone()).expect("valid shape");
        assert!(reader.has_next());
        assert!(reader.advance().expect("transfer ran"));
        assert_eq!(reader.raw_value(0).expect("status"), RawValue::text("SUCCEEDED"));
        assert!(matches!(reader.raw_value(1), Err(CursorError::InvalidColumn { index: 2, count: 1 })));
        assert!(!reader.advance().expect("single row"));

        let seen = transfer.seen.lock().expect("lock");
        assert_eq!(
            seen[0],
            TransferRequest {
                operation: "PUT".into(),
                url: "https://volume.example/upload".into(),
                headers: vec![("x-ms-blob-type".into(), "BlockBlob".into())],
                local_file: Some("/tmp/data.csv".into()),
            }
        );
    }

    #[test]
    fn failed_transfer_is_an_error() {
        let transfer = Arc::new(Recording { status: TransferStatus::Aborted, seen: Mutex::new(Vec::new()) });
        let mut reader = VolumeStatusReader::new(row(), &manifest(4), transfer).expect("valid shape");
        let err = reader.advance().expect_err("aborted");
        assert!(matches!(err, CursorError::TransferFailed { ref status, .. } if status == "ABORTED"));
    }

    #[test]
    fn shape_is_validated() {
        let transfer = Arc::new(Recording { status: TransferStatus::Succeeded, seen: Mutex::new(Vec::new()) });
        assert!(VolumeStatusReader::new(row(), &manifest(2), transfer.clone()).is_err());
        assert!(VolumeStatusReader::new(row(), &manifest(5), transfer.clone()).is_err());
        assert!(VolumeStatusReader::new(row(), &manifest(3).with_total_rows(2), transfer).is_err());
    }
}
