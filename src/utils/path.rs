//! Path utilities

use std::path::{Path, PathBuf};

use crate::domain::errors::*;

/// Prefix of every fetch intermediate
pub const TEMP_PREFIX: &str = "temp_";

/// `downloads/` next to the running executable
pub fn default_downloads_dir() -> DomainResult<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| DomainError::io("current executable", e))?;
    let dir = exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(dir.join("downloads"))
}

/// Whether a file name looks like a fetch intermediate
pub fn is_temp_name(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    name.starts_with(TEMP_PREFIX)
        && (name.starts_with("temp_audio_") || name.starts_with("temp_video_"))
        && matches!(
            path.extension().map(|e| e.to_string_lossy().to_lowercase()).as_deref(),
            Some("m4a") | Some("mp4")
        )
}

/// Make sure a directory exists before writing into it
pub fn ensure_dir(dir: &Path) -> DomainResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| DomainError::io(dir.display(), e))
}
