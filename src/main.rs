//! apidesc-convert: rewrite Lua API description files with structured
//! parameter lists.
//!
//! Two modes:
//!
//! - **stdin mode**: `apidesc-convert < APIDesc.lua > APIDesc.new.lua`
//! - **file mode**: `apidesc-convert -o out/ APIDesc.lua Classes/*.lua`

use anyhow::{bail, Context, Result};
use apidesc_convert::{convert_parsed, parse, ConvertReport, KnownClasses, Value};
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "apidesc-convert",
    about = "Convert free-text parameter descriptions in Lua API description files into typed records"
)]
struct Cli {
    /// Input files (glob patterns and directories supported). If omitted, reads from stdin.
    files: Vec<String>,

    /// Output directory. Defaults to writing `<name>.converted.lua` next to each input.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Overwrite the input files
    #[arg(long, conflicts_with = "output")]
    in_place: bool,

    /// File listing additional known class names, one per line (repeatable)
    #[arg(short = 'k', long = "known-classes")]
    known_classes: Vec<PathBuf>,

    /// Convert and verify without writing anything
    #[arg(long)]
    check: bool,

    /// Fail if any parameter type could not be inferred
    #[arg(long)]
    strict: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut known = KnownClasses::new();
    for path in &cli.known_classes {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read known classes {}", path.display()))?;
        known.extend_from_list(&text);
    }

    let report = if cli.files.is_empty() {
        stdin_mode(&cli, known)?
    } else {
        file_mode(&cli, known)?
    };

    if cli.strict && report.unknown > 0 {
        bail!(
            "{} parameter type(s) could not be inferred (--strict)",
            report.unknown
        );
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// stdin mode: one document from stdin, converted document to stdout.
fn stdin_mode(cli: &Cli, mut known: KnownClasses) -> Result<ConvertReport> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let doc = parse::parse(&input).context("failed to read <stdin>")?;
    known.extend_from_document(&doc);
    let converted = convert_parsed(doc, &known).context("failed to convert <stdin>")?;
    log_report("<stdin>", &converted.report);

    if !cli.check {
        print!("{}", converted.text);
    }
    Ok(converted.report)
}

/// file mode: read every input first so that the classes of all documents
/// are known, then convert and write each one.
fn file_mode(cli: &Cli, mut known: KnownClasses) -> Result<ConvertReport> {
    if let Some(ref dir) = cli.output {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    }

    let input_files = expand_globs(&cli.files)?;
    if input_files.is_empty() {
        bail!("no input files");
    }

    let mut failed = 0usize;
    let mut parsed: Vec<(PathBuf, Value)> = Vec::new();
    for path in input_files {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        match parse::parse(&content) {
            Ok(doc) => {
                known.extend_from_document(&doc);
                parsed.push((path, doc));
            }
            Err(e) => {
                error!(file = %path.display(), "skipping unreadable document: {}", e);
                failed += 1;
            }
        }
    }
    info!(
        documents = parsed.len(),
        known_classes = known.len(),
        "read input documents"
    );

    let mut total = ConvertReport::default();
    for (path, doc) in parsed {
        let converted = match convert_parsed(doc, &known) {
            Ok(converted) => converted,
            Err(e) if e.is_round_trip_failure() => {
                return Err(e).with_context(|| {
                    format!("self-test failed for {}, stopping", path.display())
                });
            }
            Err(e) => {
                error!(file = %path.display(), "document not converted: {}", e);
                failed += 1;
                continue;
            }
        };
        log_report(&path.display().to_string(), &converted.report);
        total += converted.report;

        if cli.check {
            continue;
        }
        let out_path = output_path(&path, cli.output.as_deref(), cli.in_place);
        fs::write(&out_path, &converted.text)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
    }

    if failed > 0 {
        bail!("{} document(s) could not be converted", failed);
    }
    Ok(total)
}

fn log_report(source: &str, report: &ConvertReport) {
    info!(
        source,
        classes = report.classes,
        signatures = report.signatures,
        converted = report.converted,
        unknown = report.unknown,
        "converted"
    );
    if report.unknown > 0 {
        warn!(source, unknown = report.unknown, "search the output for <unknown> to review");
    }
}

/// Suffix of files this tool writes next to its inputs.
const CONVERTED_SUFFIX: &str = ".converted.lua";

/// Expand glob patterns into a list of real file paths.
/// Bare directories are scanned (non-recursively) for `.lua` files.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if path.is_dir() {
            let entries = fs::read_dir(path)
                .with_context(|| format!("failed to read directory: {}", path.display()))?;
            for entry in entries.flatten() {
                let p = entry.path();
                if p.is_file() && is_description_file(&p) {
                    files.push(p);
                }
            }
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            warn!("no files matched: {}", pattern);
        }
        files.extend(matches);
    }
    // Sort for deterministic output
    files.sort();
    files.dedup();
    Ok(files)
}

/// `.lua` files that are not our own output.
fn is_description_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.ends_with(".lua") && !name.ends_with(CONVERTED_SUFFIX)
}

/// Where the converted form of `input` is written.
/// "Classes/Plugins.lua" → "Classes/Plugins.converted.lua", or
/// "<dir>/Plugins.lua" with an output directory.
fn output_path(input: &Path, output_dir: Option<&Path>, in_place: bool) -> PathBuf {
    if in_place {
        return input.to_path_buf();
    }
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => {
            let stem = file_name.strip_suffix(".lua").unwrap_or(&file_name);
            input.with_file_name(format!("{}{}", stem, CONVERTED_SUFFIX))
        }
    }
}
