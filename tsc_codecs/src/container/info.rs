//! Header-only container walk, per spec.md §4.10.
//!
//! Reads block headers by following `fpos_nxt` rather than by decoding
//! sub-block payloads, so `tsc info` stays cheap on large files.

use std::io::{Read, Seek};

use log::debug;

use tsc_core::bytesio::ByteSource;
use tsc_core::error::{Result, TscError};
use tsc_core::format::{BlockHeader, FileHeader};

/// One block's header fields, surfaced without touching its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSummary {
    pub blk_cnt: u64,
    pub rec_cnt: u64,
    pub chr_cnt: u64,
    pub pos_min: u64,
    pub pos_max: u64,
}

impl From<&BlockHeader> for BlockSummary {
    fn from(h: &BlockHeader) -> Self {
        Self {
            blk_cnt: h.blk_cnt,
            rec_cnt: h.rec_cnt,
            chr_cnt: h.chr_cnt,
            pos_min: h.pos_min,
            pos_max: h.pos_max,
        }
    }
}

pub struct InfoReader<R: Read + Seek> {
    source: ByteSource<R>,
    file_header: FileHeader,
    source_header_len: u64,
}

impl<R: Read + Seek> InfoReader<R> {
    pub fn open(source: R) -> Result<Self> {
        let mut source = ByteSource::new(source);
        let file_header = FileHeader::read(&mut source)?;
        let source_header_len = source.get_u64()?;
        Ok(Self { source, file_header, source_header_len })
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    /// Walks every block header in `fpos_nxt` order, skipping sub-block
    /// payloads entirely. Rejects a file whose chain does not strictly
    /// advance, to avoid an infinite loop on a corrupted or crafted file.
    pub fn walk_blocks(&mut self) -> Result<Vec<BlockSummary>> {
        let mut summaries = Vec::with_capacity(self.file_header.blk_n as usize);
        if self.file_header.blk_n == 0 {
            return Ok(summaries);
        }

        let first_block_fpos =
            tsc_core::format::FILE_HEADER_SIZE + 8 + self.source_header_len;
        let mut fpos = first_block_fpos;

        loop {
            self.source.seek(fpos)?;
            let header = BlockHeader::read(&mut self.source)?;
            debug!("info: block {} at offset {fpos}, {} records", header.blk_cnt, header.rec_cnt);
            summaries.push(BlockSummary::from(&header));

            if header.fpos_nxt == 0 {
                break;
            }
            if header.fpos_nxt <= fpos {
                return Err(TscError::invariant(format!(
                    "block chain did not advance: fpos={fpos}, fpos_nxt={}",
                    header.fpos_nxt
                )));
            }
            fpos = header.fpos_nxt;
        }

        if summaries.len() as u64 != self.file_header.blk_n {
            return Err(TscError::invariant(format!(
                "file header declares {} blocks, chain walk found {}",
                self.file_header.blk_n,
                summaries.len()
            )));
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::reader::ContainerReader;
    use crate::container::writer::{ContainerWriter, WriterConfig};
    use std::fs::File;
    use tsc_core::record::Record;

    fn sample_record(i: u32) -> Record {
        Record {
            qname: format!("read{i}"),
            flag: 0,
            rname: "chr1".into(),
            pos: 100 + i,
            mapq: 60,
            cigar: "5M".into(),
            rnext: "*".into(),
            pnext: 0,
            tlen: 0,
            seq: "ACGTA".into(),
            qual: "!!!!!".into(),
            opt: "NM:i:0".into(),
        }
    }

    #[test]
    fn walks_blocks_without_decoding_payloads() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = WriterConfig { block_record_cap: 3 };
        let mut writer =
            ContainerWriter::create(tmp.reopen().unwrap(), config, b"@HD\tVN:1.6\n").unwrap();
        for i in 0..7 {
            writer.add_record(&sample_record(i)).unwrap();
        }
        writer.finish().unwrap();

        let mut info = InfoReader::open(File::open(tmp.path()).unwrap()).unwrap();
        let summaries = info.walk_blocks().unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].rec_cnt, 3);
        assert_eq!(summaries[1].rec_cnt, 3);
        assert_eq!(summaries[2].rec_cnt, 1);
        assert_eq!(summaries[0].blk_cnt, 0);
        assert_eq!(summaries[2].blk_cnt, 2);
    }

    #[test]
    fn empty_container_has_no_blocks() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let writer = ContainerWriter::create(tmp.reopen().unwrap(), WriterConfig::default(), b"").unwrap();
        writer.finish().unwrap();

        let mut info = InfoReader::open(File::open(tmp.path()).unwrap()).unwrap();
        assert!(info.walk_blocks().unwrap().is_empty());
    }

    #[test]
    fn agrees_with_container_reader_record_totals() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let config = WriterConfig { block_record_cap: 4 };
        let mut writer =
            ContainerWriter::create(tmp.reopen().unwrap(), config, b"").unwrap();
        for i in 0..9 {
            writer.add_record(&sample_record(i)).unwrap();
        }
        writer.finish().unwrap();

        let mut info = InfoReader::open(File::open(tmp.path()).unwrap()).unwrap();
        let total: u64 = info.walk_blocks().unwrap().iter().map(|b| b.rec_cnt).sum();

        let mut reader = ContainerReader::open(File::open(tmp.path()).unwrap()).unwrap();
        let mut count = 0u64;
        while reader.next_record().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(total, count);
    }
}
