mod cleanup;

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tsc_codecs::container::{ContainerReader, ContainerWriter, InfoReader, WriterConfig};
use tsc_core::format::DEFAULT_BLOCK_RECORD_CAP;
use tsc_core::sam::{format_record_line, parse_record_line, split_header};

use cleanup::OutputGuard;

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "tsc",
    about = "Lossless SAM text compressor/decompressor",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a SAM file into a .tsc container
    Compress {
        /// Source .sam file
        input: PathBuf,
        /// Destination .tsc file (defaults to the input path with its
        /// extension replaced by .tsc)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
        /// Records per block
        #[arg(long, default_value_t = DEFAULT_BLOCK_RECORD_CAP)]
        block_size: u64,
        /// Print compression stats on success
        #[arg(short, long)]
        stats: bool,
        /// Print elapsed time on success
        #[arg(short = 't', long)]
        timings: bool,
        /// Increase log verbosity (repeatable)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
    /// Decompress a .tsc container back into SAM text
    Decompress {
        /// Source .tsc file
        input: PathBuf,
        /// Destination .sam file (defaults to the input path with its
        /// extension replaced by .sam)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
        /// Print decompression stats on success
        #[arg(short, long)]
        stats: bool,
        /// Print elapsed time on success
        #[arg(short = 't', long)]
        timings: bool,
        /// Increase log verbosity (repeatable)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
    /// Print file and block header metadata without decoding payloads
    Info {
        /// .tsc file to inspect
        input: PathBuf,
        /// Increase log verbosity (repeatable)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn require_extension(path: &PathBuf, allowed: &[&str], role: &str) -> anyhow::Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
        Ok(())
    } else {
        anyhow::bail!(
            "{} path {:?} must have extension {:?}, found {:?}",
            role,
            path,
            allowed,
            ext
        )
    }
}

fn with_extension(path: &PathBuf, ext: &str) -> PathBuf {
    let mut out = path.clone();
    out.set_extension(ext);
    out
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{n} B")
    } else {
        format!("{v:.2} {}", UNITS[unit])
    }
}

fn open_output(path: &PathBuf, force: bool) -> anyhow::Result<File> {
    if path.exists() && !force {
        anyhow::bail!("output file {:?} already exists (use -f to overwrite)", path);
    }
    File::create(path).with_context(|| format!("creating output file {:?}", path))
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(
    input: PathBuf,
    output: Option<PathBuf>,
    force: bool,
    block_size: u64,
    stats: bool,
    timings: bool,
) -> anyhow::Result<()> {
    require_extension(&input, &["sam"], "compress input")?;
    let output = output.unwrap_or_else(|| with_extension(&input, "tsc"));

    let mut text = String::new();
    File::open(&input)
        .with_context(|| format!("opening input file {:?}", input))?
        .read_to_string(&mut text)
        .with_context(|| format!("reading input file {:?}", input))?;
    let input_size = text.len() as u64;

    let (header, body) = split_header(&text);

    let out_file = open_output(&output, force)?;
    let mut guard = OutputGuard::new(&output);

    let t0 = Instant::now();
    let config = WriterConfig { block_record_cap: block_size };
    let mut writer = ContainerWriter::create(out_file, config, header.as_bytes())?;

    for line in body.lines() {
        if let Some(rec) = parse_record_line(line) {
            writer.add_record(&rec)?;
        }
    }
    let finish = writer.finish()?;
    let elapsed = t0.elapsed();

    guard.keep();

    let compressed_size = std::fs::metadata(&output)?.len();

    if stats {
        eprintln!("  records     : {}", finish.record_count);
        eprintln!("  blocks      : {}", finish.block_count);
        eprintln!("  raw size    : {}", human_bytes(input_size));
        eprintln!("  compressed  : {}", human_bytes(compressed_size));
        eprintln!(
            "  ratio       : {:.2}x",
            input_size as f64 / compressed_size.max(1) as f64
        );
    }
    if timings {
        eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn run_decompress(
    input: PathBuf,
    output: Option<PathBuf>,
    force: bool,
    stats: bool,
    timings: bool,
) -> anyhow::Result<()> {
    require_extension(&input, &["tsc", "gomp"], "decompress input")?;
    let output = output.unwrap_or_else(|| with_extension(&input, "sam"));

    let in_file = File::open(&input).with_context(|| format!("opening input file {:?}", input))?;
    let out_file = open_output(&output, force)?;
    let mut guard = OutputGuard::new(&output);

    let t0 = Instant::now();
    let mut reader = ContainerReader::open(in_file)?;
    let mut dst = BufWriter::new(out_file);
    dst.write_all(reader.source_header())?;

    let mut record_count = 0u64;
    while let Some(rec) = reader.next_record()? {
        dst.write_all(format_record_line(&rec).as_bytes())?;
        record_count += 1;
    }
    dst.flush()?;
    let elapsed = t0.elapsed();

    guard.keep();

    let output_size = std::fs::metadata(&output)?.len();

    if stats {
        eprintln!("  records     : {}", record_count);
        eprintln!("  output size : {}", human_bytes(output_size));
    }
    if timings {
        eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    }
    Ok(())
}

fn run_info(input: PathBuf) -> anyhow::Result<()> {
    require_extension(&input, &["tsc", "gomp"], "info input")?;
    let file = File::open(&input).with_context(|| format!("opening input file {:?}", input))?;
    let file_size = file.metadata()?.len();

    let mut info = InfoReader::open(file)?;
    let header = info.file_header().clone();
    let blocks = info.walk_blocks()?;

    println!("=== tsc container: {:?} ===", input);
    println!();
    println!("  records        : {}", header.rec_n);
    println!("  blocks         : {}", header.blk_n);
    println!("  block capacity : {}", header.blk_lc);
    println!("  file on disk   : {}", human_bytes(file_size));
    println!();
    println!(
        "  {:>6}  {:>10}  {:>8}  {:>10}  {:>10}",
        "block", "records", "chroms", "pos min", "pos max"
    );
    println!("  {}", "-".repeat(50));
    for b in &blocks {
        println!(
            "  {:>6}  {:>10}  {:>8}  {:>10}  {:>10}",
            b.blk_cnt, b.rec_cnt, b.chr_cnt, b.pos_min, b.pos_max
        );
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

/// Inserts an implicit `compress`/`decompress` subcommand name when the
/// user invokes `tsc <file>` directly, or runs a `de`-prefixed binary
/// (e.g. a `detsc` symlink), matching spec.md §6 "compress is the default".
fn normalize_args(raw: Vec<String>) -> Vec<String> {
    const KNOWN: &[&str] = &["compress", "decompress", "info", "help", "-h", "--help", "-V", "--version"];

    let exe_is_decompress = raw
        .first()
        .and_then(|p| PathBuf::from(p).file_stem().and_then(|s| s.to_str()).map(str::to_owned))
        .is_some_and(|stem| stem.starts_with("de"));

    let first_arg = raw.get(1);
    let needs_implicit = match first_arg {
        Some(a) if a.starts_with('-') => false,
        Some(a) => !KNOWN.contains(&a.as_str()),
        None => false,
    };

    if !needs_implicit {
        return raw;
    }

    let implicit = if exe_is_decompress { "decompress" } else { "compress" };
    let mut out = Vec::with_capacity(raw.len() + 1);
    out.push(raw[0].clone());
    out.push(implicit.to_string());
    out.extend(raw.into_iter().skip(1));
    out
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args().collect()));

    let verbose = match &cli.command {
        Commands::Compress { verbose, .. } => *verbose,
        Commands::Decompress { verbose, .. } => *verbose,
        Commands::Info { verbose, .. } => *verbose,
    };
    init_logging(verbose);

    match cli.command {
        Commands::Compress { input, output, force, block_size, stats, timings, .. } => {
            run_compress(input, output, force, block_size, stats, timings)
        }
        Commands::Decompress { input, output, force, stats, timings, .. } => {
            run_decompress(input, output, force, stats, timings)
        }
        Commands::Info { input, .. } => run_info(input),
    }
}
