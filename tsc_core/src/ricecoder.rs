//! Golomb-Rice coder for sequences of unsigned integers, per spec.md §4.4.
//!
//! A single parameter `k` is chosen per call from the data's mean magnitude
//! and written as the first output byte. Each value `v` is coded as
//! `q = v >> k` unary ones followed by a terminating zero, then the low `k`
//! bits of `v`.

use crate::error::{Result, TscError};

struct BitWriter {
    bytes: Vec<u8>,
    cur: u8,
    nbits: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self { bytes: Vec::new(), cur: 0, nbits: 0 }
    }

    fn push_bit(&mut self, bit: bool) {
        self.cur = (self.cur << 1) | (bit as u8);
        self.nbits += 1;
        if self.nbits == 8 {
            self.bytes.push(self.cur);
            self.cur = 0;
            self.nbits = 0;
        }
    }

    fn push_bits(&mut self, value: u64, nbits: u32) {
        for i in (0..nbits).rev() {
            self.push_bit((value >> i) & 1 != 0);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.cur <<= 8 - self.nbits;
            self.bytes.push(self.cur);
        }
        self.bytes
    }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, byte_pos: 0, bit_pos: 0 }
    }

    fn next_bit(&mut self) -> Result<bool> {
        let byte = *self
            .bytes
            .get(self.byte_pos)
            .ok_or_else(|| TscError::truncated("rice stream ended mid-symbol"))?;
        let bit = (byte >> (7 - self.bit_pos)) & 1 != 0;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.byte_pos += 1;
        }
        Ok(bit)
    }

    fn next_bits(&mut self, nbits: u32) -> Result<u64> {
        let mut v = 0u64;
        for _ in 0..nbits {
            v = (v << 1) | self.next_bit()? as u64;
        }
        Ok(v)
    }
}

/// Picks the Rice parameter `k` from the mean of `values`.
fn choose_k(values: &[u64]) -> u8 {
    if values.is_empty() {
        return 0;
    }
    let mean = values.iter().sum::<u64>() / values.len() as u64;
    let mut k = 0u8;
    while (1u64 << (k + 1)) <= mean + 1 && k < 63 {
        k += 1;
    }
    k
}

/// Encodes a sequence of unsigned integers, choosing and prefixing `k`.
pub fn rice_compress(values: &[u64]) -> Vec<u8> {
    let k = choose_k(values);
    let mut out = vec![k];
    let mut w = BitWriter::new();
    for &v in values {
        let q = v >> k;
        for _ in 0..q {
            w.push_bit(true);
        }
        w.push_bit(false);
        if k > 0 {
            w.push_bits(v & ((1u64 << k) - 1), k as u32);
        }
    }
    out.extend(w.finish());
    out
}

/// Decodes exactly `count` Rice-coded values from `input`.
pub fn rice_decompress(input: &[u8], count: usize) -> Result<Vec<u64>> {
    if input.is_empty() {
        if count == 0 {
            return Ok(Vec::new());
        }
        return Err(TscError::truncated("rice stream missing k byte"));
    }
    let k = input[0];
    let mut r = BitReader::new(&input[1..]);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut q = 0u64;
        while r.next_bit()? {
            q += 1;
        }
        let rem = if k > 0 { r.next_bits(k as u32)? } else { 0 };
        out.push((q << k) | rem);
    }
    Ok(out)
}

/// Maps a signed integer onto the unsigned domain the Rice coder expects:
/// `0, -1, 1, -2, 2, ...` → `0, 1, 2, 3, 4, ...`.
pub fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
pub fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_empty() {
        let out = rice_compress(&[]);
        let back = rice_decompress(&out, 0).unwrap();
        assert_eq!(back, Vec::<u64>::new());
    }

    #[test]
    fn roundtrip_zeros() {
        let values = vec![0u64; 20];
        let out = rice_compress(&values);
        let back = rice_decompress(&out, values.len()).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn roundtrip_small_positive_deltas() {
        let values: Vec<u64> = (0..1000).map(|i| (i % 7) as u64).collect();
        let out = rice_compress(&values);
        let back = rice_decompress(&out, values.len()).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn roundtrip_large_values() {
        let values = vec![1u64 << 40, 3, 0, (1u64 << 40) + 7, 1_000_000];
        let out = rice_compress(&values);
        let back = rice_decompress(&out, values.len()).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn zigzag_roundtrip() {
        for v in [0i64, -1, 1, -2, 2, i32::MIN as i64, i32::MAX as i64] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }

    #[test]
    fn truncated_stream_is_reported() {
        let out = rice_compress(&[5, 6, 7]);
        let truncated = &out[..out.len() - 1];
        let err = rice_decompress(truncated, 3);
        assert!(err.is_err());
    }
}
