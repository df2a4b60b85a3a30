use clap::{Args, Parser, Subcommand, ValueEnum};

use cursor_api::StatementType;

#[derive(Parser)]
#[command(name = "cursor-dump", about = "Print a statement result through a result cursor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the rows or the update count of a statement response
    Show(ShowArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    /// Statement response JSON (`manifest` plus `result.data_array`)
    #[arg(long)]
    pub response: String,

    /// TOML config with a `[cursor]` table
    #[arg(long, env = "CURSOR_CONFIG")]
    pub config: Option<String>,

    /// Kind of statement that produced the response
    #[arg(long, value_enum, default_value = "query")]
    pub statement_type: StatementKind,

    /// Stop after this many rows (overrides `max_rows_preview`)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum StatementKind {
    Query,
    Sql,
    Update,
    Metadata,
}

impl From<StatementKind> for StatementType {
    fn from(kind: StatementKind) -> Self {
        match kind {
            StatementKind::Query => StatementType::Query,
            StatementKind::Sql => StatementType::Sql,
            StatementKind::Update => StatementType::Update,
            StatementKind::Metadata => StatementType::Metadata,
        }
    }
}
