//! Table identifiers, index widths and coded indexes.

mod codedindex;
mod tableid;
mod tableinfo;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use tableid::TableId;
pub use tableinfo::{
    TableInfo, TableRowInfo, HEAP_EXTRA_DATA, HEAP_LARGE_BLOB, HEAP_LARGE_GUID,
    HEAP_LARGE_STRINGS,
};
