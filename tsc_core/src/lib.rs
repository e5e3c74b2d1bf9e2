pub mod bytesio;
pub mod crc64;
pub mod error;
pub mod format;
pub mod framing;
pub mod ricecoder;
pub mod rangecoder;
pub mod record;
pub mod sam;

pub use error::{Result, TscError};
pub use record::{ColumnArrays, Record};
