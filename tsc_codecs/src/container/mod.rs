pub mod info;
pub mod reader;
pub mod writer;

pub use info::{BlockSummary, InfoReader};
pub use reader::ContainerReader;
pub use writer::{ContainerWriter, FinishStats, WriterConfig};
