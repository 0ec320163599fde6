//! Filesystem layout for the durable tier.

use std::path::{Path, PathBuf};

/// File extension for persisted entries.
pub const ENTRY_EXT: &str = "entry";

/// Path of the file backing `key`. Keys are hex-encoded so any string is a
/// valid, reversible file name.
pub fn entry_path(root: &Path, key: &str) -> PathBuf {
    root.join(format!("{}.{}", hex::encode(key.as_bytes()), ENTRY_EXT))
}

/// Recover the storage key from an entry file path.
pub fn key_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|s| s.to_str()) != Some(ENTRY_EXT) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

/// Ensure all parent directories exist for a path.
pub fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write a file atomically (write to .tmp, then rename).
pub fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    ensure_parent_dirs(path)?;
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|s| s.to_str()).unwrap_or("tmp")
    ));
    std::fs::write(&tmp_path, contents)?;
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}
