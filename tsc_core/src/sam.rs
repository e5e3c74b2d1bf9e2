//! Minimal SAM-form text <-> [`Record`] conversion.
//!
//! spec.md §1 treats "record parsing from the text line form" as an assumed
//! external collaborator; this module is the straightforward implementation
//! that contract implies, so `tsc_cli` has something to hand `Record`s to
//! `ContainerWriter`. It does no SAM-grammar validation — fields are opaque
//! payload, exactly as spec.md §3 requires.

use crate::record::Record;

/// Splits a header block (consecutive lines starting with `@`) from the
/// start of `text`, returning `(header_bytes, rest)`.
pub fn split_header<'a>(text: &'a str) -> (&'a str, &'a str) {
    let mut end = 0;
    for line in text.split_inclusive('\n') {
        if line.starts_with('@') {
            end += line.len();
        } else {
            break;
        }
    }
    text.split_at(end)
}

/// Parses one non-header SAM line into a [`Record`].
///
/// Fields beyond the eleventh mandatory one are concatenated back into a
/// single opaque `opt` string (tab-joined), matching spec.md's model of
/// `opt` as one opaque field rather than a parsed tag list.
pub fn parse_record_line(line: &str) -> Option<Record> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    let mut fields = line.split('\t');
    let qname = fields.next()?.to_string();
    let flag = fields.next()?.parse().ok()?;
    let rname = fields.next()?.to_string();
    let pos = fields.next()?.parse().ok()?;
    let mapq = fields.next()?.parse().ok()?;
    let cigar = fields.next()?.to_string();
    let rnext = fields.next()?.to_string();
    let pnext = fields.next()?.parse().ok()?;
    let tlen = fields.next()?.parse().ok()?;
    let seq = fields.next()?.to_string();
    let qual = fields.next().unwrap_or("").to_string();
    let opt = fields.collect::<Vec<_>>().join("\t");

    Some(Record {
        qname,
        flag,
        rname,
        pos,
        mapq,
        cigar,
        rnext,
        pnext,
        tlen,
        seq,
        qual,
        opt,
    })
}

/// Formats a [`Record`] back to SAM text, per spec.md §4.9's trailing-empty
/// policy: a separator between field `f` and `f+1` is only emitted if every
/// field from `f+1` to the end is non-empty-or-followed-by-a-nonempty-field
/// — in other words, trailing empty fields (and only trailing ones) are
/// dropped along with their leading separator.
pub fn format_record_line(rec: &Record) -> String {
    let fields = [
        rec.qname.clone(),
        rec.flag.to_string(),
        rec.rname.clone(),
        rec.pos.to_string(),
        rec.mapq.to_string(),
        rec.cigar.clone(),
        rec.rnext.clone(),
        rec.pnext.to_string(),
        rec.tlen.to_string(),
        rec.seq.clone(),
        rec.qual.clone(),
        rec.opt.clone(),
    ];

    let last_nonempty = fields.iter().rposition(|f| !f.is_empty());
    let mut line = match last_nonempty {
        Some(i) => fields[..=i].join("\t"),
        None => String::new(),
    };
    line.push('\n');
    line
}
