//! Streaming container writer, per spec.md §4.8.
//!
//! # Write contract
//! Call [`ContainerWriter::add_record`] once per record; blocks flush
//! automatically at the configured record cap. Call
//! [`ContainerWriter::finish`] to flush any trailing partial block, then
//! seal the file by rewriting the header with final totals.
//!
//! # Format layout written
//! ```text
//! [FILE HEADER: 35 bytes]
//! [SOURCE HEADER: u64 size + raw bytes]
//! [BLOCK 0 header][aux][nuc][qual]
//! [BLOCK 1 header][aux][nuc][qual]
//! ...
//! ```
//! The write-then-back-patch discipline: after writing block k+1's header,
//! the writer seeks back into block k's header and overwrites `fpos_nxt`
//! with block k+1's file offset. The final block's `fpos_nxt` stays 0.

use std::collections::HashSet;
use std::io::{Seek, Write};

use log::{debug, info};

use tsc_core::bytesio::ByteSink;
use tsc_core::error::Result;
use tsc_core::format::{BlockHeader, FileHeader, DEFAULT_BLOCK_RECORD_CAP, FILE_HEADER_SIZE};
use tsc_core::record::Record;

use crate::aux::AuxCodec;
use crate::nuc::NucCodec;
use crate::qual::QualCodec;

/// Encode-time configuration: everything that varies per file but is not a
/// one-off per-call argument. Not a process-wide global (spec.md §9
/// "Global process state" — the suggested context-object redesign).
#[derive(Debug, Clone, Copy)]
pub struct WriterConfig {
    /// Records per block; becomes the file's fixed `blk_lc` header field.
    pub block_record_cap: u64,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { block_record_cap: DEFAULT_BLOCK_RECORD_CAP }
    }
}

/// Totals reported once encoding finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishStats {
    pub block_count: u64,
    pub record_count: u64,
}

pub struct ContainerWriter<W: Write + Seek> {
    sink: ByteSink<W>,
    config: WriterConfig,

    pending_count: u64,
    total_rec_n: u64,
    block_count: u64,
    /// File offset of the most recently written block header, if any —
    /// used to back-patch its `fpos_nxt` once the next block is written.
    last_block_fpos: Option<u64>,

    aux: AuxCodec,
    nuc: NucCodec,
    qual: QualCodec,

    chr_seen: HashSet<String>,
    pos_min: Option<u32>,
    pos_max: Option<u32>,
}

impl<W: Write + Seek> ContainerWriter<W> {
    /// Writes the placeholder file header and the (immediately final)
    /// source header, then returns a writer ready for [`add_record`].
    ///
    /// [`add_record`]: Self::add_record
    pub fn create(sink: W, config: WriterConfig, source_header: &[u8]) -> Result<Self> {
        let mut sink = ByteSink::new(sink);
        sink.put_buf(&[0u8; FILE_HEADER_SIZE as usize])?;
        sink.put_u64(source_header.len() as u64)?;
        sink.put_buf(source_header)?;

        debug!("wrote placeholder file header and {}-byte source header", source_header.len());

        Ok(Self {
            sink,
            config,
            pending_count: 0,
            total_rec_n: 0,
            block_count: 0,
            last_block_fpos: None,
            aux: AuxCodec::new(),
            nuc: NucCodec::new(),
            qual: QualCodec::new(),
            chr_seen: HashSet::new(),
            pos_min: None,
            pos_max: None,
        })
    }

    /// Dispatches one record into the three column codecs, flushing the
    /// current block first if it has reached `block_record_cap`.
    pub fn add_record(&mut self, rec: &Record) -> Result<()> {
        if self.pending_count >= self.config.block_record_cap {
            self.flush_block()?;
        }

        self.aux.add_record(
            &rec.qname, rec.flag, &rec.rname, rec.mapq, &rec.rnext, rec.pnext, rec.tlen, &rec.opt,
        );
        self.nuc.add_record(rec.pos, &rec.cigar, &rec.seq);
        self.qual.add_record(&rec.qual);

        if rec.pos != 0 {
            self.pos_min = Some(self.pos_min.map_or(rec.pos, |m| m.min(rec.pos)));
            self.pos_max = Some(self.pos_max.map_or(rec.pos, |m| m.max(rec.pos)));
        }
        self.chr_seen.insert(rec.rname.clone());

        self.pending_count += 1;
        self.total_rec_n += 1;
        Ok(())
    }

    fn flush_block(&mut self) -> Result<()> {
        let fpos = self.sink.tell()?;

        let header = BlockHeader {
            fpos,
            fpos_nxt: 0,
            blk_cnt: self.block_count,
            rec_cnt: self.pending_count,
            chr_cnt: self.chr_seen.len() as u64,
            pos_min: self.pos_min.unwrap_or(0) as u64,
            pos_max: self.pos_max.unwrap_or(0) as u64,
        };
        header.write(&mut self.sink)?;

        self.aux.write_block(&mut self.sink)?;
        self.nuc.write_block(&mut self.sink)?;
        self.qual.write_block(&mut self.sink)?;

        if let Some(prev_fpos) = self.last_block_fpos {
            let end = self.sink.tell()?;
            // fpos_nxt is the second u64 field of the block header.
            self.sink.seek(prev_fpos + 8)?;
            self.sink.put_u64(fpos)?;
            self.sink.seek(end)?;
        }

        debug!("flushed block {} ({} records) at offset {}", self.block_count, self.pending_count, fpos);

        self.last_block_fpos = Some(fpos);
        self.block_count += 1;
        self.pending_count = 0;
        self.chr_seen.clear();
        self.pos_min = None;
        self.pos_max = None;
        Ok(())
    }

    /// Flushes any trailing partial block, then seals the file by
    /// rewriting the header with final totals.
    pub fn finish(mut self) -> Result<FinishStats> {
        if self.pending_count > 0 {
            self.flush_block()?;
        }

        let header = FileHeader {
            flags: 0,
            rec_n: self.total_rec_n,
            blk_n: self.block_count,
            blk_lc: self.config.block_record_cap,
        };
        self.sink.seek(0)?;
        header.write(&mut self.sink)?;
        self.sink.flush()?;

        info!(
            "finished container: {} blocks, {} records",
            self.block_count, self.total_rec_n
        );

        Ok(FinishStats { block_count: self.block_count, record_count: self.total_rec_n })
    }
}
