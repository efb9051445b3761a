//! ruledoc: dump rule documentation extracted from build definition files.
//!
//! Supports two modes:
//!
//! - **stdin mode**: `ruledoc < defs.bzl` prints one JSON document
//! - **file mode**: `ruledoc -o docs/rules rules/*.bzl` writes `<stem>.json` per input

use anyhow::{Context, Result};
use clap::Parser;
use ruledoc::BuildLanguageDocument;
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ruledoc",
    about = "Extract rule documentation from build definition files"
)]
struct Cli {
    /// Input files (glob patterns and directories supported). If omitted, reads from stdin.
    files: Vec<String>,

    /// Output directory; one JSON file per input. Prints to stdout when omitted.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Emit single-line JSON
    #[arg(long)]
    compact: bool,

    /// Log extraction decisions to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.files.is_empty() {
        return stdin_mode(&cli);
    }

    file_mode(&cli)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "ruledoc=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// stdin mode: read one file from stdin, print its document.
fn stdin_mode(cli: &Cli) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;

    let doc = extract(&input, None)?;
    println!("{}", to_json(&doc, cli.compact)?);
    Ok(())
}

/// file mode: extract every input; write to the output directory or stdout.
fn file_mode(cli: &Cli) -> Result<()> {
    if let Some(dir) = &cli.output {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
    }

    let input_files = collect_inputs(&cli.files)?;
    if input_files.is_empty() {
        anyhow::bail!("no input files found");
    }

    for path in &input_files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let doc = match extract(&content, Some(path)) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        let json = to_json(&doc, cli.compact)?;

        match &cli.output {
            Some(dir) => {
                let out_path = dir.join(format!("{}.json", derive_output_name(path)));
                fs::write(&out_path, format!("{json}\n"))
                    .with_context(|| format!("failed to write {}", out_path.display()))?;
            }
            None => println!("{json}"),
        }
    }

    Ok(())
}

/// Read the file's load statements, then extract its rules.
fn extract(source: &str, path: Option<&Path>) -> Result<BuildLanguageDocument> {
    let origin = path.map(|p| p.display().to_string());
    let loads = ruledoc::extract_loads(source).map_err(|e| match &origin {
        Some(o) => e.with_origin(o),
        None => e,
    })?;
    let doc = match path {
        Some(p) => ruledoc::parse_file(p, source, &loads)?,
        None => ruledoc::parse(source, &loads)?,
    };
    Ok(doc)
}

fn to_json(doc: &BuildLanguageDocument, compact: bool) -> Result<String> {
    let json = if compact {
        serde_json::to_string(doc)
    } else {
        serde_json::to_string_pretty(doc)
    };
    json.context("failed to serialize document")
}

/// File extensions picked up when an input is a directory.
const SUPPORTED_EXTENSIONS: &[&str] = &["bzl", "star", "sky"];

/// Resolve inputs to build files. An existing file is taken as given, a
/// directory contributes its top-level build files, anything else is a glob.
fn collect_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            files.insert(path.to_path_buf());
            continue;
        }

        let patterns = if path.is_dir() {
            let dir = glob::Pattern::escape(input.trim_end_matches('/'));
            SUPPORTED_EXTENSIONS
                .iter()
                .map(|ext| format!("{dir}/*.{ext}"))
                .collect()
        } else {
            vec![input.clone()]
        };

        let before = files.len();
        for pattern in &patterns {
            let paths =
                glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
            for entry in paths {
                match entry {
                    Ok(p) if p.is_file() => {
                        files.insert(p);
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("unreadable path: {e}"),
                }
            }
        }
        if files.len() == before {
            tracing::warn!(input = %input, "no build files matched");
        }
    }
    Ok(files.into_iter().collect())
}

/// Derive the output file name (without extension) from a source path.
/// "rules/java.bzl" → "java"
fn derive_output_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_name_from_bzl() {
        assert_eq!(derive_output_name(Path::new("rules/java.bzl")), "java");
        assert_eq!(derive_output_name(Path::new("java.bzl")), "java");
    }

    #[test]
    fn output_name_no_extension() {
        assert_eq!(derive_output_name(Path::new("BUILD")), "BUILD");
    }

    #[test]
    fn directory_inputs_pick_build_files() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["a.bzl", "b.star", "notes.txt", "BUILD"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.bzl")).unwrap();

        let inputs = vec![dir.path().to_string_lossy().to_string()];
        let files = collect_inputs(&inputs).unwrap();
        assert_eq!(files, [dir.path().join("a.bzl"), dir.path().join("b.star")]);
    }

    #[test]
    fn explicit_files_and_globs_are_deduplicated() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("defs.bzl"), "").unwrap();
        fs::write(dir.path().join("BUILD"), "").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let inputs = vec![
            format!("{root}/defs.bzl"),
            format!("{root}/*.bzl"),
            format!("{root}/BUILD"),
            format!("{root}/*.missing"),
        ];
        let files = collect_inputs(&inputs).unwrap();
        assert_eq!(files, [dir.path().join("BUILD"), dir.path().join("defs.bzl")]);
    }
}
