//! pdfpack - shrink PDF files by rewriting their structure
//!
//! Recompresses streams, packs small objects into object streams, rebuilds
//! the cross-reference data and optionally linearizes the output.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use pdfpack_core::api::{CompressReport, CompressorBuilder, compress_file, unlock_file};
use pdfpack_core::{CompressOptions, PdfError, XrefMode};
use rayon::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug};

/// Rewrite PDF files into smaller, optionally linearized files.
#[derive(Parser, Debug)]
#[command(name = "pdfpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use debug logging level
    #[arg(short = 'v', long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress one PDF file
    Compress {
        /// Input PDF
        input: PathBuf,
        /// Output path (may equal the input)
        output: PathBuf,
        #[command(flatten)]
        opts: CompressArgs,
    },
    /// Write a decrypted copy of an encrypted PDF
    Unlock {
        /// Input PDF
        input: PathBuf,
        /// Output path (default: <stem>_unlocked.pdf next to the input)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Password (default: try the empty password)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Compress many PDF files into a directory, in parallel
    Batch {
        /// Output directory
        #[arg(short = 'o', long = "out-dir", required = true)]
        out_dir: PathBuf,
        /// Input PDFs
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        opts: CompressArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct CompressArgs {
    /// Password for encrypted input
    #[arg(short = 'p', long)]
    password: Option<String>,

    /// Do not linearize the output
    #[arg(long, action = ArgAction::SetTrue)]
    no_linearize: bool,

    /// Do not pack objects into object streams
    #[arg(long, action = ArgAction::SetTrue)]
    no_object_streams: bool,

    /// Write a classic xref table (implies --no-object-streams)
    #[arg(long, action = ArgAction::SetTrue)]
    classic_xref: bool,

    /// Uncompressed byte cap per object stream
    #[arg(long, value_name = "BYTES")]
    max_stream_bytes: Option<usize>,

    /// Also recompress XMP metadata streams
    #[arg(long, action = ArgAction::SetTrue)]
    recompress_metadata: bool,

    /// Leave streams with this /Type or /Subtype untouched (repeatable)
    #[arg(long = "skip-type", value_name = "NAME")]
    skip_types: Vec<String>,

    /// JSON file with compression options
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

impl CompressArgs {
    /// Options from `--config` (or defaults) with command line flags on top.
    fn options(&self) -> Result<CompressOptions> {
        let mut opts = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => CompressOptions::default(),
        };
        if let Some(password) = &self.password {
            opts.password = Some(password.clone());
        }
        if self.no_linearize {
            opts.linearize = false;
        }
        if self.no_object_streams {
            opts.use_object_streams = false;
        }
        if self.classic_xref {
            opts.xref_mode = XrefMode::Table;
            opts.use_object_streams = false;
        }
        if let Some(bytes) = self.max_stream_bytes {
            opts.max_objstm_bytes = bytes;
        }
        if self.recompress_metadata {
            opts.stream_policy.skip_metadata = false;
        }
        opts.stream_policy
            .skip_types
            .extend(self.skip_types.iter().cloned());
        Ok(opts)
    }
}

fn summary(input: &Path, output: &Path, report: &CompressReport) -> String {
    let saved = if report.input_bytes > 0 {
        100.0 - (report.output_bytes as f64 * 100.0 / report.input_bytes as f64)
    } else {
        0.0
    };
    format!(
        "{} -> {}: {} -> {} bytes ({:.1}% saved, {} objects in {} object streams)",
        input.display(),
        output.display(),
        report.input_bytes,
        report.output_bytes,
        saved,
        report.packed_objects,
        report.object_streams,
    )
}

fn run_compress(input: &Path, output: &Path, args: &CompressArgs) -> Result<()> {
    let opts = args.options()?;
    let report = CompressorBuilder::new(input)
        .with_options(opts)
        .compress_to(output)
        .with_context(|| format!("compressing {}", input.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", summary(input, output, &report));
        for warning in &report.warnings {
            eprintln!("warning: {}", warning);
        }
    }
    Ok(())
}

fn unlocked_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    input.with_file_name(format!("{}_unlocked.pdf", stem))
}

fn run_unlock(input: &Path, output: Option<&Path>, password: Option<&str>) -> Result<()> {
    let output = output.map_or_else(|| unlocked_name(input), Path::to_path_buf);
    unlock_file(input, &output, password)
        .with_context(|| format!("unlocking {}", input.display()))?;
    println!("{} -> {}", input.display(), output.display());
    Ok(())
}

/// Destination of every batch input. Two inputs may not share one.
fn batch_outputs(out_dir: &Path, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::with_capacity(files.len());
    let mut outputs = Vec::with_capacity(files.len());
    for input in files {
        let name = input.file_name().map_or_else(|| "output.pdf".into(), |n| n.to_os_string());
        let output = out_dir.join(name);
        if let Some(first) = claimed.insert(output.clone(), input) {
            bail!(
                "{} and {} would both be written to {}",
                first.display(),
                input.display(),
                output.display()
            );
        }
        outputs.push(output);
    }
    Ok(outputs)
}

fn run_batch(out_dir: &Path, files: &[PathBuf], args: &CompressArgs) -> Result<()> {
    let opts = args.options()?;
    let outputs = batch_outputs(out_dir, files)?;
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    // One document per task; the engine itself is single-threaded
    let results: Vec<(PathBuf, PathBuf, pdfpack_core::Result<CompressReport>)> = files
        .par_iter()
        .zip(outputs)
        .map(|(input, output)| {
            debug!(input = %input.display(), output = %output.display(), "batch item");
            let result = compress_file(input, &output, &opts);
            (input.clone(), output, result)
        })
        .collect();

    let mut failures = 0;
    let mut json_items = Vec::new();
    for (input, output, result) in &results {
        match result {
            Ok(report) if args.json => json_items.push(json!({
                "input": input.display().to_string(),
                "output": output.display().to_string(),
                "report": report,
            })),
            Ok(report) => println!("{}", summary(input, output, report)),
            Err(e) => {
                failures += 1;
                if args.json {
                    json_items.push(json!({
                        "input": input.display().to_string(),
                        "error": e.to_string(),
                    }));
                } else {
                    eprintln!("error: {}: {}", input.display(), e);
                }
            }
        }
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    }
    if failures > 0 {
        bail!("{} of {} files failed", failures, results.len());
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Compress {
            input,
            output,
            opts,
        } => run_compress(input, output, opts),
        Command::Unlock {
            input,
            output,
            password,
        } => run_unlock(input, output.as_deref(), password.as_deref()),
        Command::Batch {
            out_dir,
            files,
            opts,
        } => run_batch(out_dir, files, opts),
    }
}

/// Exit status: 2 for a wrong password, 1 for anything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<PdfError>() {
        Some(PdfError::WrongPassword) => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
