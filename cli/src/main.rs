use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use asm65::{AsciiTranslation, AsmError, Assembler, AssemblerOptions, OutputFormat};
use clap::{Parser, ValueEnum};
use tracing::{Level, info};

#[derive(Debug, Parser)]
#[command(
    name = "asm65",
    version,
    about = "Two-pass cross-assembler for the 6502",
    long_about = None,
    after_help = "Examples:\n  asm65 game.s\n  asm65 -f c64 -t upper -o game.prg game.s\n  asm65 -f screen game.s"
)]
struct Cli {
    /// Assembly source file.
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Raw)]
    format: Format,

    /// Output file (default: input name with .bin, or .prg for c64;
    /// screen output goes to stdout).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Commodore 64 character set for quoted text.
    #[arg(short, long, value_enum, default_value_t = Translation::None)]
    translate: Translation,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::WARN)]
    log_level: Level,

    /// Write every label and assigned symbol to FILE.
    #[arg(long, value_name = "FILE")]
    symbols: Option<PathBuf>,

    /// Evaluate one expression per input line instead of assembling.
    #[arg(long)]
    eval: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Hex trace of addresses and bytes
    Screen,
    /// Plain binary image
    Raw,
    /// Binary prefixed with the two-byte load address
    C64,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Screen => OutputFormat::Screen,
            Format::Raw => OutputFormat::Raw,
            Format::C64 => OutputFormat::C64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Translation {
    Upper,
    Lower,
    None,
}

impl From<Translation> for AsciiTranslation {
    fn from(translation: Translation) -> Self {
        match translation {
            Translation::Upper => AsciiTranslation::Upper,
            Translation::Lower => AsciiTranslation::Lower,
            Translation::None => AsciiTranslation::None,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .init();

    if !cli.input.is_file() {
        bail!("cannot open file '{}'", cli.input.display());
    }

    let options = AssemblerOptions::default()
        .with_format(cli.format.into())
        .with_translation(cli.translate.into());
    let mut assembler = Assembler::with_options(options);

    if cli.eval {
        return evaluate(&mut assembler, &cli.input);
    }

    let result = match &cli.output {
        None if options.format == OutputFormat::Screen => {
            assembler.assemble_file(&cli.input, io::stdout().lock())
        }
        output => {
            let output = output
                .clone()
                .unwrap_or_else(|| default_output(&cli.input, options.format));
            if same_path(&cli.input, &output) {
                bail!(
                    "input and output file must differ: '{}'",
                    output.display()
                );
            }
            info!(output = %output.display(), "writing");
            assembler.assemble_to_path(&cli.input, &output)
        }
    };

    let report = match result {
        Ok(report) => report,
        Err(AsmError::Failed(errors)) => {
            for error in &errors {
                eprintln!("{error}");
            }
            return Err(AsmError::Failed(errors).into());
        }
        Err(err) => return Err(err.into()),
    };
    info!(
        start = format_args!("${:04x}", report.start_address),
        end = format_args!("${:04x}", report.end_address),
        bytes = report.code_size,
        "done"
    );

    if let Some(path) = &cli.symbols {
        let file = File::create(path)
            .with_context(|| format!("cannot create symbol file '{}'", path.display()))?;
        let mut out = BufWriter::new(file);
        assembler.write_symbol_listing(&mut out)?;
        out.flush()?;
    }
    Ok(())
}

/// Prints `<line>: $xxxx (<decimal>)` for every expression line.
fn evaluate(assembler: &mut Assembler, input: &Path) -> anyhow::Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("cannot read '{}'", input.display()))?;
    let results = assembler.evaluate_lines(&input.display().to_string(), &text)?;
    let mut out = io::stdout().lock();
    for (line, value) in results {
        writeln!(out, "{line}: ${value:04x} ({value})")?;
    }
    Ok(())
}

fn default_output(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.default_extension())
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_extension() {
        assert_eq!(
            default_output(Path::new("src/game.s"), OutputFormat::Raw),
            PathBuf::from("src/game.bin")
        );
        assert_eq!(
            default_output(Path::new("game.asm"), OutputFormat::C64),
            PathBuf::from("game.prg")
        );
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from(["asm65", "-f", "c64", "-t", "upper", "-o", "x.prg", "x.s"]).unwrap();
        assert_eq!(cli.format, Format::C64);
        assert_eq!(cli.translate, Translation::Upper);
        assert_eq!(cli.output, Some(PathBuf::from("x.prg")));
        assert_eq!(cli.log_level, Level::WARN);
        assert!(!cli.eval);
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["asm65", "-f", "hex", "x.s"]).is_err());
    }
}
