pub mod config;
pub mod error;
pub mod manifest;
pub mod reader;
pub mod schema;
pub mod types;
pub mod value;

pub use config::{CursorConfig, FeatureFlags, SharedFlags};
pub use error::{ComplexKind, CursorError, ErrorKind, Result};
pub use manifest::{ResultFormat, ResultManifest, StatementType};
pub use reader::{
    BackendReader, ChunkProvider, ColumnarChunk, TransferOutcome, TransferRequest,
    TransferStatus, VolumeTransfer,
};
pub use schema::{ColumnInfo, MetadataProvider, ResultSchema};
pub use types::{PrimitiveKind, SqlType, TypeNode};
pub use value::{ArrayValue, ComplexValue, MapValue, RawValue, Scalar, StructValue};
