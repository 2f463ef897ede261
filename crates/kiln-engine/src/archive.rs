//! The release archive: a zip of the stage tree plus its checksum.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use kiln_config::BuildConfig;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::EngineError;

/// `<artifacts>/<product>-<base version>.zip`.
pub fn archive_path(config: &BuildConfig) -> PathBuf {
    config
        .artifacts_root
        .join(format!("{}-{}.zip", config.product(), config.base_version()))
}

/// Zip every file under `source_dir` into `dest`, with entry names relative
/// to `source_dir`. Returns the number of entries written.
///
/// # Errors
/// Returns an error if a file cannot be read or the archive cannot be written.
pub fn zip_dir(source_dir: &Path, dest: &Path) -> Result<usize, EngineError> {
    let files = kiln_util::fs::walk_files(source_dir)?;
    if let Some(parent) = dest.parent() {
        kiln_util::fs::ensure_dir(parent)?;
    }

    let archive_err = |message: String| EngineError::Archive {
        path: dest.display().to_string(),
        message,
    };
    let io_err = |path: &Path, source: std::io::Error| EngineError::Io {
        path: path.display().to_string(),
        source,
    };

    let out = File::create(dest).map_err(|e| io_err(dest, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(out));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in &files {
        let relative = file.strip_prefix(source_dir).unwrap_or(file);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file(name, options)
            .map_err(|e| archive_err(e.to_string()))?;
        let mut input = BufReader::new(File::open(file).map_err(|e| io_err(file, e))?);
        std::io::copy(&mut input, &mut zip).map_err(|e| io_err(file, e))?;
    }

    zip.finish().map_err(|e| archive_err(e.to_string()))?;
    Ok(files.len())
}

/// Build the release archive from the stage tree and write its checksum.
/// Returns the archive path.
///
/// # Errors
/// Returns an error if the archive or checksum cannot be written.
pub fn create_release_archive(config: &BuildConfig) -> Result<PathBuf, EngineError> {
    let dest = archive_path(config);
    let count = zip_dir(&config.output_root, &dest)?;
    let checksum = kiln_util::hash::write_checksum_file(&dest)?;
    tracing::info!(
        archive = %dest.display(),
        checksum = %checksum.display(),
        entries = count,
        "wrote release archive"
    );
    Ok(dest)
}
