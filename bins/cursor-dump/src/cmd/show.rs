use serde::Deserialize;

use cursor_api::{ComplexValue, CursorConfig, ResultManifest, StatementType};
use cursor_engine::{EngineConfig, ResultCursor, ResultPayload, open_cursor};

use crate::config::ShowArgs;
use crate::error::DumpError;

/// Statement-execution response, reduced to what the cursor needs.
#[derive(Debug, Deserialize)]
struct StatementResponse {
    manifest: ResultManifest,
    #[serde(default)]
    result: ResultData,
}

#[derive(Debug, Default, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Vec<serde_json::Value>>,
}

impl StatementResponse {
    fn load(path: &str) -> Result<Self, DumpError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DumpError::Response { context: "read", detail: format!("'{path}': {e}") })?;
        serde_json::from_str(&content)
            .map_err(|e| DumpError::Response { context: "parse", detail: format!("'{path}': {e}") })
    }
}

pub fn run(args: ShowArgs) -> Result<(), DumpError> {
    let config = match &args.config {
        Some(path) => {
            let config = EngineConfig::load(path)?;
            tracing::info!(config = %path, "loaded config");
            config.cursor
        }
        None => CursorConfig::default(),
    };

    let response = StatementResponse::load(&args.response)?;
    tracing::info!(
        response = %args.response,
        format = ?response.manifest.format,
        rows = response.result.data_array.len(),
        "loaded response"
    );

    let statement_type = StatementType::from(args.statement_type);
    let payload = ResultPayload::from_json_rows(response.result.data_array);
    let mut cursor = open_cursor(response.manifest, payload, statement_type, &config)?;

    if cursor.has_update_count()? {
        println!("updated {} rows", cursor.get_update_count()?);
        return Ok(());
    }

    let limit = args.limit.or(config.max_rows_preview);
    print_rows(&mut cursor, limit)?;
    cursor.close();
    Ok(())
}

fn print_rows(cursor: &mut ResultCursor, limit: Option<usize>) -> Result<(), DumpError> {
    let columns = cursor.metadata().column_count();
    let header = (1..=columns)
        .map(|i| cursor.metadata().column_name(i).map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", header.join("\t"));

    let mut printed = 0;
    while limit.is_none_or(|max| printed < max) && cursor.advance()? {
        let mut cells = Vec::with_capacity(columns);
        for i in 1..=columns {
            cells.push(match cursor.get_object(i)? {
                None => "NULL".to_string(),
                Some(ComplexValue::Scalar(scalar)) => scalar.to_string(),
                Some(value) => value.to_string(),
            });
        }
        println!("{}", cells.join("\t"));
        printed += 1;
    }
    tracing::info!(rows = printed, "printed result");
    Ok(())
}
