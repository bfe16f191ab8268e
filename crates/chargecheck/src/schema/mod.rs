//! Column type vocabulary and inference over loaded datasets.

mod infer;
mod types;

pub use infer::{infer_column_type, parse_timestamp};
pub use types::ColumnType;
