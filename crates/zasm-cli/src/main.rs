use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing::Level;
use zasm_common::{flatten, Assembler, ByteRange, Image, Program};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `ADDR: BYTES` lines per image
    Hex,
    /// Raw bytes, gaps between images padded with the fill byte
    Bin,
    /// Images, ranges and symbols as JSON
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "zasm")]
#[command(version, about = "Z80 assembler", long_about = None)]
struct Args {
    /// Input file (use - for stdin)
    #[arg(default_value = "-")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Hex)]
    format: Format,

    /// Address counter before the first ORG
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    origin: u16,

    /// Byte used to pad gaps in binary output
    #[arg(long, default_value = "$FF", value_parser = parse_u8)]
    fill: u8,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::WARN)]
    log_level: Level,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    images: &'a [Image],
    ranges: &'a [ByteRange],
    symbols: &'a BTreeMap<String, u16>,
}

fn parse_number(text: &str) -> Result<u32, String> {
    let (digits, radix) = match text.strip_prefix('$').or_else(|| text.strip_prefix("0x")) {
        Some(hex) => (hex, 16),
        None => match text.strip_prefix('%') {
            Some(bin) => (bin, 2),
            None => (text, 10),
        },
    };
    u32::from_str_radix(digits, radix).map_err(|e| format!("invalid number {text:?}: {e}"))
}

fn parse_u16(text: &str) -> Result<u16, String> {
    let value = parse_number(text)?;
    u16::try_from(value).map_err(|_| format!("{text} does not fit in 16 bits"))
}

fn parse_u8(text: &str) -> Result<u8, String> {
    let value = parse_number(text)?;
    u8::try_from(value).map_err(|_| format!("{text} does not fit in 8 bits"))
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("cannot read {input}"))
    }
}

fn render(program: &Program, format: Format, fill: u8) -> Result<Vec<u8>> {
    Ok(match format {
        Format::Hex => {
            let mut text = String::new();
            for image in &program.images {
                for line in image.hex_lines(16) {
                    text.push_str(&line);
                    text.push('\n');
                }
            }
            text.into_bytes()
        }
        Format::Bin => flatten(&program.images, fill)
            .map(|image| image.bytes)
            .unwrap_or_default(),
        Format::Json => {
            let output = JsonOutput {
                images: &program.images,
                ranges: &program.ranges,
                symbols: &program.symbols,
            };
            let mut json = serde_json::to_vec_pretty(&output)?;
            json.push(b'\n');
            json
        }
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    let source = read_input(&args.input)?;
    tracing::info!(input = %args.input, len = source.len(), "assembling");

    let program = match Assembler::with_origin(args.origin).assemble_source(&source) {
        Ok(program) => program,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                eprintln!("{}: {}", args.input, diagnostic);
            }
            bail!("assembly failed with {} error(s)", diagnostics.len());
        }
    };
    tracing::info!(
        images = program.images.len(),
        symbols = program.symbols.len(),
        "assembled"
    );

    let bytes = render(&program, args.format, args.fill)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &bytes).with_context(|| format!("cannot write {}", path.display()))?
        }
        None => io::stdout().write_all(&bytes)?,
    }

    Ok(())
}
