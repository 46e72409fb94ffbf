//! Metadata streams: the stream directory, the `#Strings` heap and the tables stream.

mod streamheader;
mod strings;
mod tablesheader;

pub use streamheader::{StreamHeader, STREAM_NAMES};
pub use strings::Strings;
pub use tablesheader::{TableSpan, TablesHeader};
