//! Streaming container reader, per spec.md §4.9.
//!
//! Reads the file header, the source header, then walks every block in
//! file order (not via `fpos_nxt`, which [`super::info::InfoReader`] uses
//! instead) decoding its three sub-blocks and handing back one [`Record`]
//! at a time through [`ContainerReader::next_record`].

use std::io::{Read, Seek};

use log::debug;

use tsc_core::bytesio::ByteSource;
use tsc_core::error::Result;
use tsc_core::format::{BlockHeader, FileHeader};
use tsc_core::record::{ColumnArrays, Record};

use crate::aux::AuxCodec;
use crate::nuc::NucCodec;
use crate::qual::QualCodec;

pub struct ContainerReader<R: Read + Seek> {
    source: ByteSource<R>,
    file_header: FileHeader,
    source_header: Vec<u8>,

    blocks_read: u64,
    current: ColumnArrays,
    cursor: usize,
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Reads the file header and the source header, leaving the stream
    /// positioned at the first block header (or EOF, if `blk_n == 0`).
    pub fn open(source: R) -> Result<Self> {
        let mut source = ByteSource::new(source);
        let file_header = FileHeader::read(&mut source)?;
        let source_header_len = source.get_u64()? as usize;
        let source_header = source.get_buf(source_header_len)?;

        debug!(
            "opened container: {} records, {} blocks, blk_lc={}",
            file_header.rec_n, file_header.blk_n, file_header.blk_lc
        );

        Ok(Self {
            source,
            file_header,
            source_header,
            blocks_read: 0,
            current: ColumnArrays::default(),
            cursor: 0,
        })
    }

    pub fn source_header(&self) -> &[u8] {
        &self.source_header
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    fn load_next_block(&mut self) -> Result<bool> {
        if self.blocks_read >= self.file_header.blk_n {
            return Ok(false);
        }

        let header = BlockHeader::read(&mut self.source)?;
        let mut cols = ColumnArrays::with_capacity(header.rec_cnt as usize);
        AuxCodec::decode_block(&mut self.source, &mut cols)?;
        NucCodec::decode_block(&mut self.source, &mut cols)?;
        QualCodec::decode_block(&mut self.source, &mut cols)?;

        debug!("decoded block {} ({} records)", header.blk_cnt, cols.len());

        self.current = cols;
        self.cursor = 0;
        self.blocks_read += 1;
        Ok(true)
    }

    /// Returns the next record in file order, or `None` once every block
    /// has been exhausted.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if self.cursor < self.current.len() {
                let rec = self.current.record_at(self.cursor);
                self.cursor += 1;
                return Ok(Some(rec));
            }
            if !self.load_next_block()? {
                return Ok(None);
            }
        }
    }
}
