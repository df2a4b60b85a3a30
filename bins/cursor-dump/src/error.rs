#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("response ({context}): {detail}")]
    Response { context: &'static str, detail: String },

    #[error("{0}")]
    Cursor(#[from] cursor_api::CursorError),
}
