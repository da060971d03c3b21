//! Signature command - print the content signature of a project

use super::project;
use crate::cli::args::{OutputFormat, SignatureArgs};
use crate::config::Config;
use crate::error::PolybuildResult;
use crate::fingerprint::{collect_tracked_files, FingerprintEngine, SignatureScan};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
struct SignatureJson<'a> {
    combined: String,
    files: &'a BTreeMap<String, String>,
    skipped: BTreeMap<&'a str, String>,
}

/// Execute the signature command
pub async fn execute(args: SignatureArgs, config: &Config) -> PolybuildResult<()> {
    let root = project::resolve_root(&args.path)?;
    let files = collect_tracked_files(&root, &config.fingerprint.ignore_dirs)?;
    let scan = FingerprintEngine::new()
        .with_max_file_size(config.fingerprint.max_file_size_bytes())
        .scan(&root, &files);

    match args.format {
        OutputFormat::Table => print_table(&scan),
        OutputFormat::Json => print_json(&scan)?,
        OutputFormat::Plain => print_plain(&scan),
    }

    Ok(())
}

fn print_table(scan: &SignatureScan) {
    let width = scan
        .signature
        .paths()
        .map(str::len)
        .max()
        .unwrap_or(4)
        .max(4);

    println!("{:<width$}  {}", "PATH", "DIGEST", width = width);
    println!("{}", "-".repeat(width + 18));
    for (path, digest) in &scan.signature.files {
        println!("{:<width$}  {}", path, digest, width = width);
    }
    for skipped in &scan.skipped {
        println!("{:<width$}  ({})", skipped.path, skipped.reason, width = width);
    }

    println!();
    println!(
        "Total: {} file(s), {} skipped, combined {}",
        scan.signature.len(),
        scan.skipped.len(),
        scan.signature.combined_digest()
    );
}

fn print_json(scan: &SignatureScan) -> PolybuildResult<()> {
    let json = SignatureJson {
        combined: scan.signature.combined_digest(),
        files: &scan.signature.files,
        skipped: scan
            .skipped
            .iter()
            .map(|s| (s.path.as_str(), s.reason.to_string()))
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// `digest  path` per line, like `sha256sum`
fn print_plain(scan: &SignatureScan) {
    for (path, digest) in &scan.signature.files {
        println!("{}  {}", digest, path);
    }
}
