//! On-disk layout constants and header types, per spec.md §3 and §6.
//!
//! All multi-byte integers are big-endian (spec.md §3 "Integer endianness").
//! The canonical file header layout is the second of the two the original
//! source oscillates between: `magic/flags/ver/rec_n/blk_n/sblk_m`.

use crate::bytesio::{ByteSink, ByteSource};
use crate::error::{Result, TscError};
use std::io::{Read, Seek, Write};

/// File magic: `"tsc--"` (5 bytes).
pub const MAGIC: &[u8; 5] = b"tsc--";

/// Five ASCII characters compared byte-for-byte against the file's version
/// field (spec.md §9 Open Question (b): no tolerant comparison).
pub const VERSION: &[u8; 5] = b"01.00";

/// `magic[5] + flags:u8 + version[5] + rec_n:u64 + blk_n:u64 + blk_lc:u64`.
pub const FILE_HEADER_SIZE: u64 = 5 + 1 + 5 + 8 + 8 + 8;

/// `fpos:u64 + fpos_nxt:u64 + blk_cnt:u64 + rec_cnt:u64 + chr_cnt:u64 + pos_min:u64 + pos_max:u64`.
pub const BLOCK_HEADER_SIZE: u64 = 8 * 7;

/// `magic[8] + rec_n:u64 + payload_sz:u64 + crc64:u64`.
pub const SUB_BLOCK_HEADER_SIZE: u64 = 8 + 8 + 8 + 8;

/// Default records-per-block cap (spec.md §3 "Block").
pub const DEFAULT_BLOCK_RECORD_CAP: u64 = 10_000;

pub const AUX_MAGIC: &[u8; 8] = b"aux-----";
pub const NUC_MAGIC: &[u8; 8] = b"nuc-----";
pub const QUAL_MAGIC: &[u8; 8] = b"qual----";

/// Reserved header slot for a future look-up table enabling block-level
/// random access (spec.md §9 "Cyclic intent"). Unused by this
/// implementation; kept as a named placeholder so a future format bump does
/// not need to renegotiate the name.
pub const RESERVED_LUT_POS: u64 = 0;

/// Reserved slot for a future FASTQ sub-block-count field, alongside
/// `RESERVED_LUT_POS` (spec.md §9).
pub const RESERVED_SBLK_M: u64 = 0;

// ── file header ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub flags: u8,
    /// Total record count across the file; may be 0 at write start and is
    /// patched at finalize.
    pub rec_n: u64,
    pub blk_n: u64,
    /// Records per block — fixed for the whole file (`blk_lc`).
    pub blk_lc: u64,
}

impl FileHeader {
    pub fn new(blk_lc: u64) -> Self {
        Self { flags: 0, rec_n: 0, blk_n: 0, blk_lc }
    }

    pub fn write<W: Write + Seek>(&self, sink: &mut ByteSink<W>) -> Result<()> {
        sink.put_buf(MAGIC)?;
        sink.put_byte(self.flags)?;
        sink.put_buf(VERSION)?;
        sink.put_u64(self.rec_n)?;
        sink.put_u64(self.blk_n)?;
        sink.put_u64(self.blk_lc)?;
        Ok(())
    }

    pub fn read<R: Read + Seek>(source: &mut ByteSource<R>) -> Result<Self> {
        let magic = source.get_buf(5)?;
        if magic != MAGIC {
            return Err(TscError::malformed_header(format!(
                "bad magic: expected {:?}, got {:?}",
                MAGIC, magic
            )));
        }
        let flags = source.get_byte()?;
        let version = source.get_buf(5)?;
        if version != VERSION {
            return Err(TscError::malformed_header(format!(
                "version mismatch: this build writes/reads {:?} exactly, file has {:?}",
                String::from_utf8_lossy(VERSION),
                String::from_utf8_lossy(&version),
            )));
        }
        let rec_n = source.get_u64()?;
        let blk_n = source.get_u64()?;
        let blk_lc = source.get_u64()?;
        Ok(Self { flags, rec_n, blk_n, blk_lc })
    }
}

// ── block header ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub fpos: u64,
    pub fpos_nxt: u64,
    pub blk_cnt: u64,
    pub rec_cnt: u64,
    pub chr_cnt: u64,
    pub pos_min: u64,
    pub pos_max: u64,
}

impl BlockHeader {
    pub fn write<W: Write + Seek>(&self, sink: &mut ByteSink<W>) -> Result<()> {
        sink.put_u64(self.fpos)?;
        sink.put_u64(self.fpos_nxt)?;
        sink.put_u64(self.blk_cnt)?;
        sink.put_u64(self.rec_cnt)?;
        sink.put_u64(self.chr_cnt)?;
        sink.put_u64(self.pos_min)?;
        sink.put_u64(self.pos_max)?;
        Ok(())
    }

    pub fn read<R: Read + Seek>(source: &mut ByteSource<R>) -> Result<Self> {
        Ok(Self {
            fpos: source.get_u64()?,
            fpos_nxt: source.get_u64()?,
            blk_cnt: source.get_u64()?,
            rec_cnt: source.get_u64()?,
            chr_cnt: source.get_u64()?,
            pos_min: source.get_u64()?,
            pos_max: source.get_u64()?,
        })
    }
}

// ── sub-block header + payload ──────────────────────────────────────────────

/// `magic[8] | rec_n:u64 | payload_sz:u64 | crc64:u64 | payload`.
pub struct SubBlock {
    pub magic: [u8; 8],
    pub rec_n: u64,
    pub payload: Vec<u8>,
}

impl SubBlock {
    pub fn new(magic: &[u8; 8], rec_n: u64, payload: Vec<u8>) -> Self {
        Self { magic: *magic, rec_n, payload }
    }

    pub fn write<W: Write + Seek>(&self, sink: &mut ByteSink<W>) -> Result<()> {
        let crc = crate::crc64::crc64(&self.payload);
        sink.put_buf(&self.magic)?;
        sink.put_u64(self.rec_n)?;
        sink.put_u64(self.payload.len() as u64)?;
        sink.put_u64(crc)?;
        sink.put_buf(&self.payload)?;
        Ok(())
    }

    /// Reads a sub-block, verifying its magic (against `expected_magic`) and
    /// its CRC64 before returning the payload.
    pub fn read<R: Read + Seek>(
        source: &mut ByteSource<R>,
        expected_magic: &[u8; 8],
        tag: &'static str,
    ) -> Result<Self> {
        let magic_buf = source.get_buf(8)?;
        if magic_buf != expected_magic {
            return Err(TscError::malformed_block(
                tag,
                format!("bad sub-block magic: expected {:?}, got {:?}", expected_magic, magic_buf),
            ));
        }
        let rec_n = source.get_u64()?;
        let payload_sz = source.get_u64()?;
        let stored_crc = source.get_u64()?;
        let payload = source.get_buf(payload_sz as usize)?;

        let computed_crc = crate::crc64::crc64(&payload);
        if computed_crc != stored_crc {
            return Err(TscError::malformed_block(
                tag,
                format!("crc64 mismatch: expected {:016x}, computed {:016x}", stored_crc, computed_crc),
            ));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&magic_buf);
        Ok(Self { magic, rec_n, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn file_header_roundtrip() {
        let header = FileHeader { flags: 0, rec_n: 42, blk_n: 3, blk_lc: 10_000 };
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        header.write(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();
        assert_eq!(buf.len(), FILE_HEADER_SIZE as usize);

        let mut source = ByteSource::new(Cursor::new(buf));
        let back = FileHeader::read(&mut source).unwrap();
        assert_eq!(back, header);
    }

    #[test]
    fn file_header_rejects_bad_version() {
        let header = FileHeader::new(10_000);
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        header.write(&mut sink).unwrap();
        let mut buf = sink.into_inner().into_inner();
        buf[6..11].copy_from_slice(b"99.99");

        let mut source = ByteSource::new(Cursor::new(buf));
        let err = FileHeader::read(&mut source).unwrap_err();
        assert!(matches!(err, TscError::MalformedHeader { .. }));
    }

    #[test]
    fn block_header_roundtrip() {
        let header = BlockHeader {
            fpos: 35,
            fpos_nxt: 0,
            blk_cnt: 0,
            rec_cnt: 1,
            chr_cnt: 1,
            pos_min: 1,
            pos_max: 1,
        };
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        header.write(&mut sink).unwrap();
        let buf = sink.into_inner().into_inner();
        assert_eq!(buf.len(), BLOCK_HEADER_SIZE as usize);

        let mut source = ByteSource::new(Cursor::new(buf));
        assert_eq!(BlockHeader::read(&mut source).unwrap(), header);
    }

    #[test]
    fn sub_block_roundtrip_and_crc_detection() {
        let sb = SubBlock::new(AUX_MAGIC, 2, b"hello\tworld\n".to_vec());
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        sb.write(&mut sink).unwrap();
        let mut buf = sink.into_inner().into_inner();

        {
            let mut source = ByteSource::new(Cursor::new(buf.clone()));
            let back = SubBlock::read(&mut source, AUX_MAGIC, "aux").unwrap();
            assert_eq!(back.payload, b"hello\tworld\n");
            assert_eq!(back.rec_n, 2);
        }

        // Flip a payload byte: CRC must catch it.
        let payload_start = (SUB_BLOCK_HEADER_SIZE) as usize;
        buf[payload_start] ^= 0xFF;
        let mut source = ByteSource::new(Cursor::new(buf));
        let err = SubBlock::read(&mut source, AUX_MAGIC, "aux").unwrap_err();
        match err {
            TscError::MalformedBlock { sub_block, .. } => assert_eq!(sub_block, "aux"),
            other => panic!("expected MalformedBlock, got {other:?}"),
        }
    }
}
