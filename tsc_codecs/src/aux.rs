//! Column codec for QNAME, FLAG, RNAME, MAPQ, RNEXT, PNEXT, TLEN, OPT
//! (spec.md §4.5).

use log::debug;
use tsc_core::bytesio::{ByteSink, ByteSource};
use tsc_core::error::{Result, TscError};
use tsc_core::format::{SubBlock, AUX_MAGIC};
use tsc_core::framing::{read_framed, write_framed};
use tsc_core::rangecoder::{compress_o0, decompress_o0};
use tsc_core::record::ColumnArrays;
use std::io::{Read, Seek, Write};

/// Accumulates the aux residue string for one block and emits it as an
/// order-0 range-coded sub-block on `write_block`.
#[derive(Default)]
pub struct AuxCodec {
    residue: String,
    count: u64,
}

impl AuxCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record's aux fields to the in-memory residue string.
    #[allow(clippy::too_many_arguments)]
    pub fn add_record(
        &mut self,
        qname: &str,
        flag: u16,
        rname: &str,
        mapq: u8,
        rnext: &str,
        pnext: u32,
        tlen: i64,
        opt: &str,
    ) {
        self.residue.push_str(qname);
        self.residue.push('\t');
        self.residue.push_str(&flag.to_string());
        self.residue.push('\t');
        self.residue.push_str(rname);
        self.residue.push('\t');
        self.residue.push_str(&mapq.to_string());
        self.residue.push('\t');
        self.residue.push_str(rnext);
        self.residue.push('\t');
        self.residue.push_str(&pnext.to_string());
        self.residue.push('\t');
        self.residue.push_str(&tlen.to_string());
        self.residue.push('\t');
        self.residue.push_str(opt);
        self.residue.push('\n');
        self.count += 1;
    }

    /// Entropy-codes the accumulated residue, writes it as an `"aux-----"`
    /// sub-block, and resets the codec for the next block.
    pub fn write_block<W: Write + Seek>(&mut self, sink: &mut ByteSink<W>) -> Result<()> {
        let bytes = std::mem::take(&mut self.residue).into_bytes();
        let count = self.count;
        self.count = 0;

        let encoded = compress_o0(&bytes);
        let mut payload = Vec::new();
        write_framed(&mut payload, &encoded, bytes.len() as u64);

        debug!(
            "aux: {} records, {} residue bytes -> {} encoded",
            count,
            bytes.len(),
            encoded.len()
        );

        SubBlock::new(AUX_MAGIC, count, payload).write(sink)
    }

    /// Reads one `"aux-----"` sub-block and appends its records to `out`.
    pub fn decode_block<R: Read + Seek>(
        source: &mut ByteSource<R>,
        out: &mut ColumnArrays,
    ) -> Result<()> {
        let sb = SubBlock::read(source, AUX_MAGIC, "aux")?;
        let mut pos = 0usize;
        let (decoded_len, encoded) = read_framed(&sb.payload, &mut pos)?;
        let residue_bytes = decompress_o0(encoded, decoded_len as usize)?;
        let residue = String::from_utf8(residue_bytes)
            .map_err(|e| TscError::malformed_block("aux", format!("residue is not valid utf-8: {e}")))?;

        let mut lines = residue.split('\n');
        for _ in 0..sb.rec_n {
            let line = lines
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "fewer residue lines than rec_n"))?;
            let mut fields = line.split('\t');
            let qname = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing qname field"))?;
            let flag: u16 = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing flag field"))?
                .parse()
                .map_err(|_| TscError::malformed_block("aux", "flag is not a u16"))?;
            let rname = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing rname field"))?;
            let mapq: u8 = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing mapq field"))?
                .parse()
                .map_err(|_| TscError::malformed_block("aux", "mapq is not a u8"))?;
            let rnext = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing rnext field"))?;
            let pnext: u32 = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing pnext field"))?
                .parse()
                .map_err(|_| TscError::malformed_block("aux", "pnext is not a u32"))?;
            let tlen: i64 = fields
                .next()
                .ok_or_else(|| TscError::malformed_block("aux", "missing tlen field"))?
                .parse()
                .map_err(|_| TscError::malformed_block("aux", "tlen is not an i64"))?;
            let opt = fields.collect::<Vec<_>>().join("\t");

            out.qname.push(qname.to_string());
            out.flag.push(flag);
            out.rname.push(rname.to_string());
            out.mapq.push(mapq);
            out.rnext.push(rnext.to_string());
            out.pnext.push(pnext);
            out.tlen.push(tlen);
            out.opt.push(opt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_single_record() {
        let mut enc = AuxCodec::new();
        enc.add_record("r1", 0, "chr1", 30, "*", 0, 0, "NM:i:0");

        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        enc.write_block(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();

        let mut source = ByteSource::new(Cursor::new(buf));
        let mut out = ColumnArrays::with_capacity(1);
        AuxCodec::decode_block(&mut source, &mut out).unwrap();

        assert_eq!(out.qname, vec!["r1"]);
        assert_eq!(out.flag, vec![0]);
        assert_eq!(out.rname, vec!["chr1"]);
        assert_eq!(out.mapq, vec![30]);
        assert_eq!(out.rnext, vec!["*"]);
        assert_eq!(out.pnext, vec![0]);
        assert_eq!(out.tlen, vec![0]);
        assert_eq!(out.opt, vec!["NM:i:0"]);
    }

    #[test]
    fn roundtrip_many_records_with_empty_opt() {
        let mut enc = AuxCodec::new();
        for i in 0..500u16 {
            enc.add_record(&format!("read{i}"), i % 16, "chrX", 60, "=", i as u32, -(i as i64), "");
        }

        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        enc.write_block(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();

        let mut source = ByteSource::new(Cursor::new(buf));
        let mut out = ColumnArrays::with_capacity(500);
        AuxCodec::decode_block(&mut source, &mut out).unwrap();

        assert_eq!(out.len(), 500);
        assert_eq!(out.qname[499], "read499");
        assert_eq!(out.opt[0], "");
        assert_eq!(out.tlen[499], -499);
    }

    #[test]
    fn crc_tamper_is_detected() {
        let mut enc = AuxCodec::new();
        enc.add_record("r1", 0, "chr1", 30, "*", 0, 0, "");
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        enc.write_block(&mut sink).unwrap();
        let mut buf = sink.into_inner().into_inner();

        let payload_start = tsc_core::format::SUB_BLOCK_HEADER_SIZE as usize;
        buf[payload_start] ^= 0xFF;

        let mut source = ByteSource::new(Cursor::new(buf));
        let mut out = ColumnArrays::with_capacity(1);
        let err = AuxCodec::decode_block(&mut source, &mut out).unwrap_err();
        match err {
            TscError::MalformedBlock { sub_block, .. } => assert_eq!(sub_block, "aux"),
            other => panic!("expected MalformedBlock, got {other:?}"),
        }
    }
}
