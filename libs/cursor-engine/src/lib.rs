pub mod config;
pub mod convert;
pub mod cursor;
pub mod grammar;
pub mod reader;
pub mod resolver;

use std::sync::Arc;

use cursor_api::{CursorConfig, Result, ResultManifest, StatementType};

pub use config::EngineConfig;
pub use convert::{convert, convert_json, serialize};
pub use cursor::{AFFECTED_ROWS_COLUMN, Column, CursorState, ResultCursor};
pub use grammar::{parse_array, parse_map, parse_struct, parse_type};
pub use resolver::{ResultPayload, ResultResolver};

/// Resolve a statement result and wrap it in a cursor.
pub fn open_cursor(
    manifest: ResultManifest,
    payload: ResultPayload,
    statement_type: StatementType,
    config: &CursorConfig,
) -> Result<ResultCursor> {
    let reader = ResultResolver::new(config).resolve(&manifest, payload)?;
    Ok(ResultCursor::new(reader, Arc::new(manifest), statement_type, Arc::new(config.clone())))
}
