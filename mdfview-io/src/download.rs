use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::IoError;

/// 将原始字节按调用方给定的文件名保存，不做任何转码。
pub fn save_download(bytes: &[u8], directory: &Path, filename: &str) -> Result<PathBuf, IoError> {
    if filename.trim().is_empty()
        || filename.contains(['/', '\\'])
        || filename == "."
        || filename == ".."
    {
        return Err(IoError::InvalidFileName(filename.to_string()));
    }

    fs::create_dir_all(directory).map_err(|source| IoError::WriteError {
        path: directory.to_path_buf(),
        source,
    })?;
    let path = directory.join(filename);
    fs::write(&path, bytes).map_err(|source| IoError::WriteError {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), size = bytes.len(), "已保存图纸文件");
    Ok(path)
}
