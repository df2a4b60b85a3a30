use std::sync::Arc;
use std::thread;

use cursor_api::{
    ColumnInfo, ColumnarChunk, ComplexValue, CursorConfig, ErrorKind, RawValue, ResultFormat,
    ResultManifest, Scalar, SharedFlags, StatementType, TransferOutcome, TransferRequest,
    TransferStatus, VolumeTransfer,
};
use cursor_engine::reader::chunk_channel;
use cursor_engine::{ResultCursor, ResultPayload, ResultResolver};

fn streamed_manifest(rows: u64, chunks: u64) -> ResultManifest {
    let mut manifest = ResultManifest::new(
        ResultFormat::ArrowStream,
        vec![
            ColumnInfo::new("id", "BIGINT"),
            ColumnInfo::new("tags", "ARRAY<STRING>"),
        ],
    )
    .with_total_rows(rows);
    manifest.total_chunk_count = Some(chunks);
    manifest
}

fn chunk(ids: std::ops::Range<i64>) -> ColumnarChunk {
    let tags = ids
        .clone()
        .map(|id| RawValue::Seq(vec![RawValue::text(format!("t{id}")), RawValue::Null]))
        .collect();
    ColumnarChunk::new(vec![ids.map(RawValue::Int).collect(), tags])
}

#[test]
fn cursor_reads_rows_downloaded_on_another_thread() {
    let manifest = streamed_manifest(6, 3);
    let (tx, provider) = chunk_channel(1, 3);
    let downloader = thread::spawn(move || {
        for range in [0..2, 2..2, 2..6] {
            tx.blocking_send(Ok(chunk(range))).expect("cursor alive");
        }
    });

    let flags = Arc::new(SharedFlags::new(true));
    let reader = ResultResolver::default()
        .resolve(&manifest, ResultPayload::Chunks(Box::new(provider)))
        .expect("streamed reader");
    let mut cursor = ResultCursor::new(reader, Arc::new(manifest), StatementType::Query, flags.clone());

    let mut ids = Vec::new();
    while cursor.advance().expect("advance") {
        ids.push(cursor.get_long("id").expect("id"));
        let tags = cursor.get_array(2).expect("tags").expect("not null");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.elements()[1], ComplexValue::Null);
    }
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    downloader.join().expect("downloader finished");
}

#[test]
fn feature_flag_is_read_on_each_call() {
    let manifest = streamed_manifest(2, 1);
    let (tx, provider) = chunk_channel(1, 1);
    tx.blocking_send(Ok(chunk(0..2))).expect("queued");
    drop(tx);

    let flags = Arc::new(SharedFlags::new(false));
    let reader = ResultResolver::default()
        .resolve(&manifest, ResultPayload::Chunks(Box::new(provider)))
        .expect("streamed reader");
    let mut cursor = ResultCursor::new(reader, Arc::new(manifest), StatementType::Query, flags.clone());
    cursor.advance().expect("row");

    assert_eq!(cursor.get_array(2).expect_err("disabled").kind(), ErrorKind::Unsupported);
    assert_eq!(cursor.get_string(2).expect("text").as_deref(), Some(r#"["t0",null]"#));

    flags.set_complex_types(true);
    let tags = cursor.get_array(2).expect("enabled").expect("not null");
    assert_eq!(tags.elements()[0], ComplexValue::Scalar(Scalar::String("t0".into())));
}

struct Upload;

impl VolumeTransfer for Upload {
    fn execute(&self, request: &TransferRequest) -> TransferOutcome {
        if request.local_file.is_some() {
            TransferOutcome { status: TransferStatus::Succeeded, message: String::new() }
        } else {
            TransferOutcome { status: TransferStatus::Failed, message: "no local file".into() }
        }
    }
}

fn volume_manifest() -> ResultManifest {
    let mut manifest = ResultManifest::new(
        ResultFormat::JsonArray,
        ["operation", "presignedUrl", "headers", "localFile"]
            .map(|name| ColumnInfo::new(name, "STRING"))
            .to_vec(),
    )
    .with_total_rows(1);
    manifest.is_volume_operation = true;
    manifest
}

#[test]
fn volume_operation_reports_status_through_cursor() {
    let config = CursorConfig { enable_volume_operations: true, ..CursorConfig::default() };
    let resolver = ResultResolver::new(&config).with_volume_transfer(Arc::new(Upload));
    let manifest = volume_manifest();
    let payload = ResultPayload::from_json_rows(vec![vec![
        "PUT".into(),
        "https://volume.example/f".into(),
        "{}".into(),
        "/tmp/f.csv".into(),
    ]]);

    let reader = resolver.resolve(&manifest, payload).expect("volume reader");
    let mut cursor = ResultCursor::new(reader, Arc::new(manifest), StatementType::Sql, Arc::new(config));
    assert!(cursor.advance().expect("transfer ran"));
    assert_eq!(cursor.get_string(1).expect("status").as_deref(), Some("SUCCEEDED"));
    assert_eq!(cursor.get_string(2).expect_err("status only").kind(), ErrorKind::NotFound);
    assert!(!cursor.advance().expect("single row"));
}

#[test]
fn failed_volume_operation_surfaces_on_advance() {
    let config = CursorConfig { enable_volume_operations: true, ..CursorConfig::default() };
    let resolver = ResultResolver::new(&config).with_volume_transfer(Arc::new(Upload));
    let manifest = volume_manifest();
    let payload = ResultPayload::from_json_rows(vec![vec![
        "GET".into(),
        "https://volume.example/f".into(),
        serde_json::Value::Null,
        serde_json::Value::Null,
    ]]);

    let reader = resolver.resolve(&manifest, payload).expect("volume reader");
    let mut cursor = ResultCursor::new(reader, Arc::new(manifest), StatementType::Sql, Arc::new(config));
    let err = cursor.advance().expect_err("transfer failed");
    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert!(err.to_string().contains("no local file"));
}
