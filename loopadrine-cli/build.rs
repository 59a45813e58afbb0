//! Build metadata for the loopadrine startup banner
//!
//! Exposes `GIT_HASH`, `BUILD_TIMESTAMP` and `BUILD_PROFILE` to `env!`.
//! No rerun-if-changed directives are emitted, so the values refresh on
//! every build.

use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Short commit hash of the checkout, if this is a git checkout at all
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|hash| !hash.is_empty())
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

fn main() {
    let git_hash = git_short_hash().unwrap_or_else(|| UNKNOWN.to_string());
    let timestamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string());

    emit("GIT_HASH", &git_hash);
    emit("BUILD_TIMESTAMP", &timestamp);
    emit("BUILD_PROFILE", &profile);
}
