//! Byte-oriented adaptive range (arithmetic) coder with order-0 and order-1
//! contexts, per spec.md §4.3.
//!
//! The renormalization loop is the classic carryless range-coder
//! construction (Subbotin-style): the encoder forces `range` to shrink to a
//! boundary-aligned value whenever it gets too small to guarantee the top
//! byte of `low` is stable, which is the "pending bytes" underflow handling
//! the spec calls for, expressed without an explicit cache/cache_size
//! carry-propagation buffer.

use crate::error::{Result, TscError};

const TOP: u32 = 1 << 24;
const BOT: u32 = 1 << 16;
/// Ceiling on a symbol table's cumulative frequency total. Must stay well
/// under `BOT` so `range / total_freq` never starves renormalization.
const MAX_TOTAL: u32 = 1 << 15;

// ── shared frequency table ──────────────────────────────────────────────────

/// A 256-symbol cumulative frequency table used by both order-0 and each
/// order-1 context.
#[derive(Clone)]
struct FreqTable {
    /// `cum[s]` is the cumulative frequency of all symbols `< s`.
    /// `cum[256]` is the total.
    cum: [u32; 257],
}

impl FreqTable {
    fn from_freqs(freq: &[u32; 256]) -> Self {
        let mut cum = [0u32; 257];
        for s in 0..256 {
            cum[s + 1] = cum[s] + freq[s];
        }
        Self { cum }
    }

    fn total(&self) -> u32 {
        self.cum[256]
    }

    fn cum_freq(&self, symbol: u8) -> u32 {
        self.cum[symbol as usize]
    }

    fn freq(&self, symbol: u8) -> u32 {
        self.cum[symbol as usize + 1] - self.cum[symbol as usize]
    }

    /// Finds the symbol whose `[cum_freq, cum_freq+freq)` interval contains
    /// `target`. Linear scan over 256 entries; the tables are small enough
    /// that this never shows up in profiles next to the I/O it guards.
    fn symbol_for(&self, target: u32) -> u8 {
        for s in 0..256 {
            if target < self.cum[s + 1] {
                return s as u8;
            }
        }
        255
    }
}

/// Scales a raw byte histogram down to a cumulative total `<= MAX_TOTAL`,
/// keeping every symbol that appeared at least once at a frequency of at
/// least 1 so the decoder can still address it.
fn scale_histogram(hist: &[u64; 256]) -> [u32; 256] {
    let sum: u64 = hist.iter().sum();
    let mut freq = [0u32; 256];
    if sum == 0 {
        return freq;
    }
    for s in 0..256 {
        if hist[s] > 0 {
            let scaled = ((hist[s] as u128 * MAX_TOTAL as u128) / sum as u128) as u32;
            freq[s] = scaled.max(1);
        }
    }
    freq
}

fn histogram(data: &[u8]) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    hist
}

// ── encoder / decoder primitives ────────────────────────────────────────────

struct Encoder {
    low: u32,
    range: u32,
    out: Vec<u8>,
}

impl Encoder {
    fn new() -> Self {
        Self { low: 0, range: 0xFFFF_FFFF, out: Vec::new() }
    }

    fn encode(&mut self, cum_freq: u32, freq: u32, total_freq: u32) {
        self.range /= total_freq;
        self.low = self.low.wrapping_add(cum_freq.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(freq);

        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) < TOP {
                // top byte stable, nothing to do
            } else if self.range < BOT {
                self.range = self.low.wrapping_neg() & (BOT - 1);
            } else {
                break;
            }
            self.out.push((self.low >> 24) as u8);
            self.low <<= 8;
            self.range <<= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        for _ in 0..4 {
            self.out.push((self.low >> 24) as u8);
            self.low <<= 8;
        }
        self.out
    }
}

struct Decoder<'a> {
    low: u32,
    range: u32,
    code: u32,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8]) -> Self {
        let mut d = Self { low: 0, range: 0xFFFF_FFFF, code: 0, input, pos: 0 };
        for _ in 0..4 {
            d.code = (d.code << 8) | d.next_byte() as u32;
        }
        d
    }

    fn next_byte(&mut self) -> u8 {
        let b = self.input.get(self.pos).copied().unwrap_or(0);
        self.pos += 1;
        b
    }

    fn get_freq(&mut self, total_freq: u32) -> u32 {
        self.range /= total_freq;
        let value = self.code.wrapping_sub(self.low) / self.range;
        value.min(total_freq - 1)
    }

    fn decode(&mut self, cum_freq: u32, freq: u32) {
        self.low = self.low.wrapping_add(cum_freq.wrapping_mul(self.range));
        self.range = self.range.wrapping_mul(freq);

        loop {
            if (self.low ^ self.low.wrapping_add(self.range)) < TOP {
            } else if self.range < BOT {
                self.range = self.low.wrapping_neg() & (BOT - 1);
            } else {
                break;
            }
            self.code = (self.code << 8) | self.next_byte() as u32;
            self.low <<= 8;
            self.range <<= 8;
        }
    }
}

// ── order-0 ──────────────────────────────────────────────────────────────────

fn write_o0_header(freq: &[u32; 256], out: &mut Vec<u8>) {
    let nonzero: Vec<(u8, u32)> = (0..256u16)
        .filter_map(|s| {
            let f = freq[s as usize];
            if f > 0 {
                Some((s as u8, f))
            } else {
                None
            }
        })
        .collect();
    out.extend_from_slice(&(nonzero.len() as u16).to_be_bytes());
    for (symbol, f) in nonzero {
        out.push(symbol);
        out.extend_from_slice(&(f as u16).to_be_bytes());
    }
}

fn read_o0_header(input: &[u8]) -> Result<([u32; 256], usize)> {
    if input.len() < 2 {
        return Err(TscError::malformed_stream("order-0 header truncated"));
    }
    let count = u16::from_be_bytes([input[0], input[1]]) as usize;
    let mut pos = 2;
    let mut freq = [0u32; 256];
    for _ in 0..count {
        if pos + 3 > input.len() {
            return Err(TscError::malformed_stream("order-0 header truncated mid-entry"));
        }
        let symbol = input[pos];
        let f = u16::from_be_bytes([input[pos + 1], input[pos + 2]]) as u32;
        if f == 0 {
            return Err(TscError::malformed_stream("order-0 header has zero-frequency symbol"));
        }
        freq[symbol as usize] = f;
        pos += 3;
    }
    Ok((freq, pos))
}

/// Compresses `input` with an order-0 (memoryless) adaptive table.
pub fn compress_o0(input: &[u8]) -> Vec<u8> {
    let hist = histogram(input);
    let freq = scale_histogram(&hist);
    let mut out = Vec::new();
    write_o0_header(&freq, &mut out);

    if input.is_empty() {
        return out;
    }

    let table = FreqTable::from_freqs(&freq);
    let mut enc = Encoder::new();
    for &b in input {
        enc.encode(table.cum_freq(b), table.freq(b), table.total());
    }
    out.extend(enc.finish());
    out
}

/// Decompresses an order-0 stream produced by [`compress_o0`], reading
/// exactly `expected_out_size` symbols.
pub fn decompress_o0(input: &[u8], expected_out_size: usize) -> Result<Vec<u8>> {
    let (freq, header_len) = read_o0_header(input)?;
    if expected_out_size == 0 {
        return Ok(Vec::new());
    }
    let table = FreqTable::from_freqs(&freq);
    if table.total() == 0 {
        return Err(TscError::malformed_stream(
            "order-0 stream has no symbols but expected output is non-empty",
        ));
    }

    let mut dec = Decoder::new(&input[header_len..]);
    let mut out = Vec::with_capacity(expected_out_size);
    for _ in 0..expected_out_size {
        let target = dec.get_freq(table.total());
        let symbol = table.symbol_for(target);
        dec.decode(table.cum_freq(symbol), table.freq(symbol));
        out.push(symbol);
    }
    Ok(out)
}

// ── order-1 ──────────────────────────────────────────────────────────────────

/// Fixed starting context byte for order-1 coding (spec's Open Question (c)).
const ORDER1_INITIAL_CONTEXT: u8 = 0;

fn write_o1_header(tables: &[[u32; 256]; 256], out: &mut Vec<u8>) {
    let contexts: Vec<u8> = (0..256u16)
        .filter(|&c| tables[c as usize].iter().any(|&f| f > 0))
        .map(|c| c as u8)
        .collect();
    out.extend_from_slice(&(contexts.len() as u16).to_be_bytes());
    for &c in &contexts {
        out.push(c);
        for s in 0..256 {
            let f = tables[c as usize][s];
            if f > 0 {
                out.push(s as u8);
                out.extend_from_slice(&(f as u16).to_be_bytes());
            }
        }
        // sentinel: symbol byte is irrelevant, freq 0 marks end-of-context
        out.push(0);
        out.extend_from_slice(&0u16.to_be_bytes());
    }
}

fn read_o1_header(input: &[u8]) -> Result<([[u32; 256]; 256], usize)> {
    if input.len() < 2 {
        return Err(TscError::malformed_stream("order-1 header truncated"));
    }
    let num_contexts = u16::from_be_bytes([input[0], input[1]]) as usize;
    let mut pos = 2;
    let mut tables = [[0u32; 256]; 256];

    for _ in 0..num_contexts {
        if pos + 1 > input.len() {
            return Err(TscError::malformed_stream("order-1 header truncated before context byte"));
        }
        let ctx = input[pos];
        pos += 1;
        loop {
            if pos + 3 > input.len() {
                return Err(TscError::malformed_stream("order-1 header truncated mid-entry"));
            }
            let symbol = input[pos];
            let f = u16::from_be_bytes([input[pos + 1], input[pos + 2]]) as u32;
            pos += 3;
            if f == 0 {
                break; // sentinel
            }
            tables[ctx as usize][symbol as usize] = f;
        }
    }
    Ok((tables, pos))
}

/// Compresses `input` with an order-1 (single-previous-byte) adaptive table.
pub fn compress_o1(input: &[u8]) -> Vec<u8> {
    let mut hists = vec![[0u64; 256]; 256];
    let mut ctx = ORDER1_INITIAL_CONTEXT;
    for &b in input {
        hists[ctx as usize][b as usize] += 1;
        ctx = b;
    }

    let mut tables = [[0u32; 256]; 256];
    for c in 0..256 {
        tables[c] = scale_histogram(&hists[c]);
    }

    let mut out = Vec::new();
    write_o1_header(&tables, &mut out);
    if input.is_empty() {
        return out;
    }

    let freq_tables: Vec<FreqTable> = tables.iter().map(FreqTable::from_freqs).collect();
    let mut enc = Encoder::new();
    let mut ctx = ORDER1_INITIAL_CONTEXT;
    for &b in input {
        let table = &freq_tables[ctx as usize];
        enc.encode(table.cum_freq(b), table.freq(b), table.total());
        ctx = b;
    }
    out.extend(enc.finish());
    out
}

/// Decompresses an order-1 stream produced by [`compress_o1`], reading
/// exactly `expected_out_size` symbols.
pub fn decompress_o1(input: &[u8], expected_out_size: usize) -> Result<Vec<u8>> {
    let (tables, header_len) = read_o1_header(input)?;
    if expected_out_size == 0 {
        return Ok(Vec::new());
    }
    let freq_tables: Vec<FreqTable> = tables.iter().map(FreqTable::from_freqs).collect();

    let mut dec = Decoder::new(&input[header_len..]);
    let mut out = Vec::with_capacity(expected_out_size);
    let mut ctx = ORDER1_INITIAL_CONTEXT;
    for _ in 0..expected_out_size {
        let table = &freq_tables[ctx as usize];
        if table.total() == 0 {
            return Err(TscError::malformed_stream(format!(
                "order-1 context {ctx} has no transitions but was required to decode a symbol"
            )));
        }
        let target = dec.get_freq(table.total());
        let symbol = table.symbol_for(target);
        dec.decode(table.cum_freq(symbol), table.freq(symbol));
        out.push(symbol);
        ctx = symbol;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn o0_roundtrip_empty() {
        let out = compress_o0(b"");
        let back = decompress_o0(&out, 0).unwrap();
        assert_eq!(back, Vec::<u8>::new());
    }

    #[test]
    fn o0_roundtrip_single_symbol() {
        let data = vec![42u8; 100];
        let out = compress_o0(&data);
        let back = decompress_o0(&out, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn o0_roundtrip_text() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        let out = compress_o0(&data);
        let back = decompress_o0(&out, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn o0_roundtrip_all_byte_values() {
        let data: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let out = compress_o0(&data);
        let back = decompress_o0(&out, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn o1_roundtrip_empty() {
        let out = compress_o1(b"");
        let back = decompress_o1(&out, 0).unwrap();
        assert_eq!(back, Vec::<u8>::new());
    }

    #[test]
    fn o1_roundtrip_structured_data() {
        // Highly context-dependent data: 'A' always followed by 'C', etc.
        let data = b"ACGTACGTACGTACGTACGTACGTACGTACGT".repeat(20);
        let out = compress_o1(&data);
        let back = decompress_o1(&out, data.len()).unwrap();
        assert_eq!(back, data);
        // order-1 should compress this better than order-0 on this input
        let o0 = compress_o0(&data);
        assert!(out.len() < o0.len());
    }

    #[test]
    fn o1_roundtrip_random_bytes() {
        let mut rng: u64 = 0x1234_5678_9abc_def0;
        let data: Vec<u8> = (0..5000)
            .map(|_| {
                rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
                (rng >> 33) as u8
            })
            .collect();
        let out = compress_o1(&data);
        let back = decompress_o1(&out, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn o0_malformed_header_is_reported() {
        let err = decompress_o0(&[0xFF], 10).unwrap_err();
        assert!(matches!(err, TscError::MalformedStream { .. }));
    }
}
