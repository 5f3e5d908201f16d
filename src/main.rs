// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for cp2pdf.
//!
//! This binary provides the `cp2pdf` command for converting GitHub Copilot
//! chat exports from JSON to PDF.

use cp2pdf::{parser, pdf, renderer};
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_TITLE: &str = "GitHub Copilot Chat Export";

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: PathBuf,
    output: PathBuf,
    page_size: pdf::PageSize,
    show_timestamps: bool,
    show_model: bool,
    show_tools: bool,
    title_page: bool,
    requests_per_page: usize,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("input {} does not exist", path.display()))]
    InputNotFound { path: PathBuf },

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to parse {}: {source}", path.display()))]
    ParseFile {
        path: PathBuf,
        source: parser::ParseError,
    },

    #[snafu(display("failed to render {}: {source}", path.display()))]
    RenderPdf {
        path: PathBuf,
        source: pdf::PdfError,
    },

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert GitHub Copilot chat exports to PDF

Usage: {name} [OPTIONS] <INPUT> <OUTPUT>

Arguments:
  <INPUT>   Input JSON export (or a directory containing exports)
  <OUTPUT>  Output PDF file (or a directory when INPUT is a directory)

Options:
      --page-size <SIZE>    Page size: letter or a4 (default: letter)
      --per-page <N>        Messages per page before a page break (default: 3, 0 = never)
      --no-title-page       Omit the title page

Metadata display (use --show-* or --hide-*):
      --show-timestamps     Include timestamps (default: on)
      --hide-timestamps     Hide timestamps
      --show-model          Include model ID (default: off)
      --hide-model          Hide model ID
      --show-tools          Include tool invocations (default: off)
      --hide-tools          Hide tool invocations
  -v, --verbose             Alias for --show-tools

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be processed without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version

Set RUST_LOG=debug for diagnostic output.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut page_size = pdf::PageSize::default();
    // Defaults: timestamps on, model off, tools off
    let mut show_timestamps = true;
    let mut show_model = false;
    let mut show_tools = false;
    let mut title_page = true;
    let mut requests_per_page: usize = 3;
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Long("page-size") => page_size = parser.value()?.parse()?,
            Long("per-page") => {
                requests_per_page = parser
                    .value()?
                    .parse()
                    .map_err(|_| "per-page must be a non-negative number")?;
            }
            Long("no-title-page") => title_page = false,
            // Show/hide flags - last one wins
            Long("show-timestamps") => show_timestamps = true,
            Long("hide-timestamps") => show_timestamps = false,
            Long("show-model") => show_model = true,
            Long("hide-model") => show_model = false,
            Short('v') | Long("verbose" | "show-tools") => show_tools = true,
            Long("hide-tools") => show_tools = false,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            Value(val) if output.is_none() => output = Some(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input: input.ok_or("missing required argument: <INPUT>")?,
        output: output.ok_or("missing required argument: <OUTPUT>")?,
        page_size,
        show_timestamps,
        show_model,
        show_tools,
        title_page,
        requests_per_page,
        quiet,
        dry_run,
        force,
    })
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "error" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_logging(cli.quiet);

    ensure!(
        cli.input.exists(),
        InputNotFoundSnafu {
            path: cli.input.clone()
        }
    );

    if cli.input.is_dir() {
        let files = collect_input_files(&cli.input);
        log::debug!("found {} export(s) in {}", files.len(), cli.input.display());
        if !cli.dry_run {
            std::fs::create_dir_all(&cli.output).context(CreateOutputDirSnafu)?;
        }
        for file in &files {
            let out_name = file.file_stem().context(InvalidFilenameSnafu)?;
            let out_path = cli
                .output
                .join(format!("{}.pdf", out_name.to_string_lossy()));
            process_file(file, &out_path, &cli)?;
        }
    } else {
        if cli.input.extension().is_none_or(|ext| ext != "json") {
            log::warn!(
                "{} does not have a .json extension",
                cli.input.display()
            );
        }
        process_file(&cli.input, &cli.output, &cli)?;
    }

    Ok(())
}

/// Collects all JSON files below a directory.
fn collect_input_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Creates render options from CLI arguments.
fn make_render_options(cli: &Cli) -> renderer::RenderOptions {
    renderer::RenderOptions {
        show_timestamps: cli.show_timestamps,
        show_model: cli.show_model,
        show_tools: cli.show_tools,
        title_page: cli.title_page,
        requests_per_page: cli.requests_per_page,
        ..Default::default()
    }
}

/// Converts a single export and writes the PDF to `out_path`.
fn process_file(input: &Path, out_path: &Path, cli: &Cli) -> Result<(), Error> {
    // Handle dry-run mode
    if cli.dry_run {
        eprintln!("Would write {}", out_path.display());
        return Ok(());
    }

    // Check if output exists and handle overwrite
    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    let json = std::fs::read_to_string(input).context(ReadFileSnafu { path: input })?;
    let chat = parser::parse_chat(&json).context(ParseFileSnafu { path: input })?;

    let story = renderer::render_chat(&chat, &make_render_options(cli));
    let bytes = pdf::write_pdf(&story, cli.page_size, DOCUMENT_TITLE)
        .context(RenderPdfSnafu { path: input })?;

    // Create parent directory if needed
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateOutputDirSnafu)?;
    }
    std::fs::write(out_path, &bytes).context(WriteFileSnafu { path: out_path })?;

    if !cli.quiet {
        eprintln!(
            "Wrote {} ({} messages)",
            out_path.display(),
            chat.requests.len()
        );
    }
    Ok(())
}
