// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file replacement: write to a per-process, per-call temp name then
//! rename over the target. Readers never observe a partially-written file.

use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

fn temp_name(target: &Path) -> std::path::PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let pid = std::process::id();
    let file_name = target.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    target.with_file_name(format!("{file_name}.tmp-{pid}-{nanos}"))
}

/// Write `contents` to `path` atomically: write the temp file with mode
/// `0600`, then rename it over `path`. On non-unix targets the permission
/// step is skipped; the rename step still makes the replacement atomic.
pub fn write(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_name(path);
    std::fs::write(&tmp, contents)?;
    #[cfg(unix)]
    {
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp, perms)?;
    }
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
