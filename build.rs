//! Stamps the binary with when and from what it was built.
//!
//! `DOCKET_BUILD_TIMESTAMP` is UTC, taken from `SOURCE_DATE_EPOCH` when set
//! so packaged builds are reproducible. `DOCKET_GIT_COMMIT` is the short
//! hash, suffixed `-dirty` for uncommitted changes, or "unknown".

use chrono::{DateTime, Utc};
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");

    let built_at = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);
    println!(
        "cargo:rustc-env=DOCKET_BUILD_TIMESTAMP={}",
        built_at.format("%Y-%m-%dT%H:%M:%SZ")
    );

    let commit = match (git(&["rev-parse", "--short", "HEAD"]), git(&["status", "--porcelain"])) {
        (Some(hash), Some(changes)) if !changes.is_empty() => format!("{}-dirty", hash),
        (Some(hash), _) => hash,
        (None, _) => "unknown".to_string(),
    };
    println!("cargo:rustc-env=DOCKET_GIT_COMMIT={}", commit);
}

/// Trimmed stdout of a successful git command.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}
