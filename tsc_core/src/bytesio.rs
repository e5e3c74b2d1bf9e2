//! Length-prefixed, big-endian primitive I/O over a seekable stream.
//!
//! Mirrors the `fwrite_uintXX`/`fread_uintXX` wrapper functions of the
//! original `frw.h`: every multi-byte integer on disk is big-endian and the
//! wrappers are bit-exact inverses of each other regardless of host
//! endianness.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Result, TscError};

/// Writes primitives to a seekable byte sink, big-endian.
pub struct ByteSink<W: Write + Seek> {
    inner: W,
}

impl<W: Write + Seek> ByteSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn put_byte(&mut self, byte: u8) -> Result<()> {
        self.inner.write_all(&[byte]).map_err(TscError::Io)
    }

    pub fn put_buf(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_all(buf).map_err(TscError::Io)
    }

    pub fn put_u16(&mut self, value: u16) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes()).map_err(TscError::Io)
    }

    pub fn put_u32(&mut self, value: u32) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes()).map_err(TscError::Io)
    }

    pub fn put_u64(&mut self, value: u64) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes()).map_err(TscError::Io)
    }

    pub fn put_i64(&mut self, value: i64) -> Result<()> {
        self.inner.write_all(&value.to_be_bytes()).map_err(TscError::Io)
    }

    pub fn tell(&mut self) -> Result<u64> {
        self.inner.stream_position().map_err(TscError::Io)
    }

    pub fn seek(&mut self, absolute_offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(absolute_offset))
            .map(|_| ())
            .map_err(TscError::Io)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(TscError::Io)
    }
}

/// Reads primitives from a seekable byte source, big-endian.
pub struct ByteSource<R: Read + Seek> {
    inner: R,
}

impl<R: Read + Seek> ByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    fn read_exact_or_truncated(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TscError::truncated(format!("short read while reading {what}"))
            } else {
                TscError::Io(e)
            }
        })
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_or_truncated(&mut buf, "a byte")?;
        Ok(buf[0])
    }

    pub fn get_buf(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact_or_truncated(&mut buf, "a buffer")?;
        Ok(buf)
    }

    pub fn get_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact_or_truncated(&mut buf, "a u16")?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn get_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact_or_truncated(&mut buf, "a u32")?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn get_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact_or_truncated(&mut buf, "a u64")?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn get_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact_or_truncated(&mut buf, "an i64")?;
        Ok(i64::from_be_bytes(buf))
    }

    pub fn tell(&mut self) -> Result<u64> {
        self.inner.stream_position().map_err(TscError::Io)
    }

    pub fn seek(&mut self, absolute_offset: u64) -> Result<()> {
        self.inner
            .seek(SeekFrom::Start(absolute_offset))
            .map(|_| ())
            .map_err(TscError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn roundtrip_integers() {
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        sink.put_byte(0xAB).unwrap();
        sink.put_u32(0xDEAD_BEEF).unwrap();
        sink.put_u64(0x0102_0304_0506_0708).unwrap();
        sink.put_i64(-12345).unwrap();
        let buf = sink.into_inner().into_inner();

        assert_eq!(buf[0], 0xAB);
        assert_eq!(&buf[1..5], &[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut src = ByteSource::new(Cursor::new(buf));
        assert_eq!(src.get_byte().unwrap(), 0xAB);
        assert_eq!(src.get_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(src.get_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(src.get_i64().unwrap(), -12345);
    }

    #[test]
    fn seek_and_tell_support_back_patching() {
        let mut sink = ByteSink::new(Cursor::new(Vec::new()));
        sink.put_u64(0).unwrap(); // placeholder
        let patch_pos = 0u64;
        sink.put_buf(b"payload").unwrap();
        let end = sink.tell().unwrap();

        sink.seek(patch_pos).unwrap();
        sink.put_u64(0x42).unwrap();
        sink.seek(end).unwrap();

        let buf = sink.into_inner().into_inner();
        let mut src = ByteSource::new(Cursor::new(buf));
        assert_eq!(src.get_u64().unwrap(), 0x42);
    }

    #[test]
    fn short_read_is_truncated_error() {
        let mut src = ByteSource::new(Cursor::new(vec![1u8, 2, 3]));
        let err = src.get_u64().unwrap_err();
        assert!(matches!(err, TscError::Truncated { .. }));
    }
}
