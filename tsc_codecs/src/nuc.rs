//! Column codec for POS, CIGAR, SEQ (spec.md §4.6).
//!
//! Emission shape inside the `"nuc-----"` sub-block payload: a Rice-coded
//! positional-delta stream (first `pos` absolute, subsequent values signed
//! differences, zig-zag mapped to unsigned), then the CIGAR residue, then
//! the SEQ residue, each order-0 range-coded. Every inner stream is
//! length-prefixed via [`tsc_core::framing`].

use log::debug;
use tsc_core::bytesio::{ByteSink, ByteSource};
use tsc_core::error::{Result, TscError};
use tsc_core::format::{SubBlock, NUC_MAGIC};
use tsc_core::framing::{read_framed, write_framed};
use tsc_core::rangecoder::{compress_o0, decompress_o0};
use tsc_core::record::ColumnArrays;
use tsc_core::ricecoder::{rice_compress, rice_decompress, zigzag_decode, zigzag_encode};
use std::io::{Read, Seek, Write};

#[derive(Default)]
pub struct NucCodec {
    pos: Vec<u32>,
    cigar_residue: String,
    seq_residue: String,
}

impl NucCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&mut self, pos: u32, cigar: &str, seq: &str) {
        self.pos.push(pos);
        self.cigar_residue.push_str(cigar);
        self.cigar_residue.push('\n');
        self.seq_residue.push_str(seq);
        self.seq_residue.push('\n');
    }

    pub fn write_block<W: Write + Seek>(&mut self, sink: &mut ByteSink<W>) -> Result<()> {
        let count = self.pos.len() as u64;

        let mut deltas = Vec::with_capacity(self.pos.len());
        let mut prev: i64 = 0;
        for (i, &p) in self.pos.iter().enumerate() {
            let signed = if i == 0 { p as i64 } else { p as i64 - prev };
            deltas.push(zigzag_encode(signed));
            prev = p as i64;
        }
        let pos_encoded = rice_compress(&deltas);

        let cigar_bytes = std::mem::take(&mut self.cigar_residue).into_bytes();
        let cigar_encoded = compress_o0(&cigar_bytes);

        let seq_bytes = std::mem::take(&mut self.seq_residue).into_bytes();
        let seq_encoded = compress_o0(&seq_bytes);

        self.pos.clear();

        let mut payload = Vec::new();
        write_framed(&mut payload, &pos_encoded, count);
        write_framed(&mut payload, &cigar_encoded, cigar_bytes.len() as u64);
        write_framed(&mut payload, &seq_encoded, seq_bytes.len() as u64);

        debug!(
            "nuc: {} records, pos={}B cigar={}B seq={}B encoded",
            count,
            pos_encoded.len(),
            cigar_encoded.len(),
            seq_encoded.len()
        );

        SubBlock::new(NUC_MAGIC, count, payload).write(sink)
    }

    pub fn decode_block<R: Read + Seek>(
        source: &mut ByteSource<R>,
        out: &mut ColumnArrays,
    ) -> Result<()> {
        let sb = SubBlock::read(source, NUC_MAGIC, "nuc")?;
        let rec_cnt = sb.rec_n as usize;

        let mut pos = 0usize;
        let (pos_count, pos_encoded) = read_framed(&sb.payload, &mut pos)?;
        let deltas = rice_decompress(pos_encoded, pos_count as usize)?;
        if deltas.len() != rec_cnt {
            return Err(TscError::malformed_block(
                "nuc",
                format!("pos stream decoded {} values, expected {}", deltas.len(), rec_cnt),
            ));
        }
        let mut prev: i64 = 0;
        for (i, &d) in deltas.iter().enumerate() {
            let signed = zigzag_decode(d);
            let absolute = if i == 0 { signed } else { prev + signed };
            prev = absolute;
            out.pos.push(absolute as u32);
        }

        let (cigar_decoded_len, cigar_encoded) = read_framed(&sb.payload, &mut pos)?;
        let cigar_bytes = decompress_o0(cigar_encoded, cigar_decoded_len as usize)?;
        let cigar_residue = String::from_utf8(cigar_bytes)
            .map_err(|e| TscError::malformed_block("nuc", format!("cigar residue is not utf-8: {e}")))?;
        let mut cigar_lines = cigar_residue.split('\n');
        for _ in 0..rec_cnt {
            let line = cigar_lines
                .next()
                .ok_or_else(|| TscError::malformed_block("nuc", "fewer cigar lines than rec_cnt"))?;
            out.cigar.push(line.to_string());
        }

        let (seq_decoded_len, seq_encoded) = read_framed(&sb.payload, &mut pos)?;
        let seq_bytes = decompress_o0(seq_encoded, seq_decoded_len as usize)?;
        let seq_residue = String::from_utf8(seq_bytes)
            .map_err(|e| TscError::malformed_block("nuc", format!("seq residue is not utf-8: {e}")))?;
        let mut seq_lines = seq_residue.split('\n');
        for _ in 0..rec_cnt {
            let line = seq_lines
                .next()
                .ok_or_else(|| TscError::malformed_block("nuc", "fewer seq lines than rec_cnt"))?;
            out.seq.push(line.to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_increasing_positions() {
        let mut enc = NucCodec::new();
        enc.add_record(100, "5M", "ACGTA");
        enc.add_record(150, "3M2I", "ACG");
        enc.add_record(90, "10M", "ACGTACGTAC"); // unmapped-adjacent / out-of-order is allowed

        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        enc.write_block(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();

        let mut source = ByteSource::new(Cursor::new(buf));
        let mut out = ColumnArrays::with_capacity(3);
        NucCodec::decode_block(&mut source, &mut out).unwrap();

        assert_eq!(out.pos, vec![100, 150, 90]);
        assert_eq!(out.cigar, vec!["5M", "3M2I", "10M"]);
        assert_eq!(out.seq, vec!["ACGTA", "ACG", "ACGTACGTAC"]);
    }

    #[test]
    fn roundtrip_unmapped_record() {
        let mut enc = NucCodec::new();
        enc.add_record(0, "*", "*");

        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        enc.write_block(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();

        let mut source = ByteSource::new(Cursor::new(buf));
        let mut out = ColumnArrays::with_capacity(1);
        NucCodec::decode_block(&mut source, &mut out).unwrap();

        assert_eq!(out.pos, vec![0]);
        assert_eq!(out.cigar, vec!["*"]);
        assert_eq!(out.seq, vec!["*"]);
    }

    #[test]
    fn roundtrip_many_records() {
        let mut enc = NucCodec::new();
        for i in 0..2000u32 {
            enc.add_record(1000 + i * 3, "100M", "ACGTACGTACGTACGTACGT");
        }
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        enc.write_block(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();

        let mut source = ByteSource::new(Cursor::new(buf));
        let mut out = ColumnArrays::with_capacity(2000);
        NucCodec::decode_block(&mut source, &mut out).unwrap();

        assert_eq!(out.len(), 2000);
        assert_eq!(out.pos[1999], 1000 + 1999 * 3);
    }
}
