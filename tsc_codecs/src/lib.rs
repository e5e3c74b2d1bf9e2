//! Column codecs and block container orchestration for SAM record
//! compression, built on the primitives in `tsc_core`.

pub mod aux;
pub mod container;
pub mod nuc;
pub mod qual;

pub use aux::AuxCodec;
pub use container::{BlockSummary, ContainerReader, ContainerWriter, FinishStats, InfoReader, WriterConfig};
pub use nuc::NucCodec;
pub use qual::QualCodec;
