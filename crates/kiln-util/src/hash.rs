//! SHA-256 checksums for release archives.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::UtilError;

/// Compute the SHA-256 hex digest of a file using streaming reads.
///
/// # Errors
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, UtilError> {
    let file = std::fs::File::open(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).map_err(|source| UtilError::Io {
            path: path.display().to_string(),
            source,
        })?;
        if n == 0 {
            break;
        }
        let Some(chunk) = buf.get(..n) else {
            break;
        };
        hasher.update(chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `<path>.sha256` next to `path` in `sha256sum` format
/// (`<hex>  <file name>`), returning the checksum file's path.
///
/// # Errors
/// Returns an error if `path` cannot be hashed or the checksum file cannot be written.
pub fn write_checksum_file(path: &Path) -> Result<PathBuf, UtilError> {
    let digest = sha256_file(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut checksum_name = path.as_os_str().to_owned();
    checksum_name.push(".sha256");
    let checksum_path = PathBuf::from(checksum_name);

    std::fs::write(&checksum_path, format!("{digest}  {name}\n")).map_err(|source| {
        UtilError::Io {
            path: checksum_path.display().to_string(),
            source,
        }
    })?;
    Ok(checksum_path)
}
