//! Input handling: bounded prefixes for sniffing and full dataset loads.

mod parser;
mod prefix;
mod source;

pub use parser::{detect_delimiter, format_name, parse_row, CsvInput, CsvSource};
pub use prefix::{decode_lenient, FileKind, RawPrefix};
pub use source::{DataSource, DataTable, SourceMetadata};
