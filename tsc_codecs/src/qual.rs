//! Column codec for QUAL (spec.md §4.7).
//!
//! The residue is the newline-joined concatenation of `qual` strings,
//! order-1 range-coded. This is the simplest codec in the pipeline and
//! serves as the reference for fallthrough behavior: no column-specific
//! prediction, just the entropy coder.

use log::debug;
use tsc_core::bytesio::{ByteSink, ByteSource};
use tsc_core::error::{Result, TscError};
use tsc_core::format::{SubBlock, QUAL_MAGIC};
use tsc_core::framing::{read_framed, write_framed};
use tsc_core::rangecoder::{compress_o1, decompress_o1};
use tsc_core::record::ColumnArrays;
use std::io::{Read, Seek, Write};

#[derive(Default)]
pub struct QualCodec {
    residue: String,
    count: u64,
}

impl QualCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, qual: &str) {
        self.residue.push_str(qual);
        self.residue.push('\n');
        self.count += 1;
    }

    pub fn write_block<W: Write + Seek>(&mut self, sink: &mut ByteSink<W>) -> Result<()> {
        let bytes = std::mem::take(&mut self.residue).into_bytes();
        let count = self.count;
        self.count = 0;

        let encoded = compress_o1(&bytes);
        let mut payload = Vec::new();
        write_framed(&mut payload, &encoded, bytes.len() as u64);

        debug!("qual: {} records, {} residue bytes -> {} encoded", count, bytes.len(), encoded.len());

        SubBlock::new(QUAL_MAGIC, count, payload).write(sink)
    }

    pub fn decode_block<R: Read + Seek>(
        source: &mut ByteSource<R>,
        out: &mut ColumnArrays,
    ) -> Result<()> {
        let sb = SubBlock::read(source, QUAL_MAGIC, "qual")?;
        let mut pos = 0usize;
        let (decoded_len, encoded) = read_framed(&sb.payload, &mut pos)?;
        let residue_bytes = decompress_o1(encoded, decoded_len as usize)?;
        let residue = String::from_utf8(residue_bytes)
            .map_err(|e| TscError::malformed_block("qual", format!("residue is not valid utf-8: {e}")))?;

        let mut lines = residue.split('\n');
        for _ in 0..sb.rec_n {
            let line = lines
                .next()
                .ok_or_else(|| TscError::malformed_block("qual", "fewer residue lines than rec_n"))?;
            out.qual.push(line.to_string());
        }
        Ok(())
    }
}
