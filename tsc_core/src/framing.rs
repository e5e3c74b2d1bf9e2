//! Shared length-prefix framing for an entropy-coded stream embedded inside
//! a sub-block payload.
//!
//! A range-coder or Rice-coder output is not self-delimiting as *encoded*
//! bytes within a larger buffer holding several such streams back to back —
//! the header only tells the decoder how many *decoded* symbols to produce,
//! not how many encoded bytes to consume. Every inner stream is therefore
//! written as `encoded_len:u64 | decoded_len:u64 | encoded_bytes`, the
//! generalization of spec.md §4.6's "each inner stream is length-prefixed
//! (u64) inside the sub-block payload" to every column codec.

use crate::error::{Result, TscError};

pub fn write_framed(out: &mut Vec<u8>, encoded: &[u8], decoded_len: u64) {
    out.extend_from_slice(&(encoded.len() as u64).to_be_bytes());
    out.extend_from_slice(&decoded_len.to_be_bytes());
    out.extend_from_slice(encoded);
}

/// Reads one framed stream starting at `*pos`, advancing `*pos` past it.
/// Returns `(decoded_len, encoded_bytes)`.
pub fn read_framed<'a>(buf: &'a [u8], pos: &mut usize) -> Result<(u64, &'a [u8])> {
    if *pos + 16 > buf.len() {
        return Err(TscError::malformed_stream("framed stream header truncated"));
    }
    let encoded_len = u64::from_be_bytes(buf[*pos..*pos + 8].try_into().unwrap());
    let decoded_len = u64::from_be_bytes(buf[*pos + 8..*pos + 16].try_into().unwrap());
    *pos += 16;
    let end = *pos + encoded_len as usize;
    if end > buf.len() {
        return Err(TscError::malformed_stream("framed stream body truncated"));
    }
    let encoded = &buf[*pos..end];
    *pos = end;
    Ok((decoded_len, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_multiple_frames() {
        let mut out = Vec::new();
        write_framed(&mut out, b"abc", 10);
        write_framed(&mut out, b"defgh", 20);

        let mut pos = 0;
        let (d1, e1) = read_framed(&out, &mut pos).unwrap();
        assert_eq!(d1, 10);
        assert_eq!(e1, b"abc");
        let (d2, e2) = read_framed(&out, &mut pos).unwrap();
        assert_eq!(d2, 20);
        assert_eq!(e2, b"defgh");
        assert_eq!(pos, out.len());
    }

    #[test]
    fn truncated_frame_is_reported() {
        let mut out = Vec::new();
        write_framed(&mut out, b"abc", 10);
        out.truncate(out.len() - 1);
        let mut pos = 0;
        assert!(read_framed(&out, &mut pos).is_err());
    }
}
