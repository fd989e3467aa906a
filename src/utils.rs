use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read and parse a whole JSON document from a file stream.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize `value` as JSON indented with four spaces.
pub fn to_writer_pretty4<W: Write, T: Serialize + ?Sized>(
    writer: W,
    value: &T,
) -> serde_json::Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)
}

/// Write `value` to `path` as four-space indented JSON.
///
/// The document goes to a sibling temporary file first and is renamed into
/// place once complete, so a failed run never leaves a truncated file behind.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_output_directory(parent)?;
    }

    let tmp_path = temporary_path(path);
    let result = write_json_file(&tmp_path, value).and_then(|()| {
        fs::rename(&tmp_path, path).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
    });

    if result.is_err() && tmp_path.exists() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!(
                "Failed to remove temporary file {}: {}",
                tmp_path.display(),
                e
            );
        }
    }
    result
}

fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let to_write_error = |source: std::io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_write_error)?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty4(&mut writer, value).map_err(|e| to_write_error(e.into()))?;
    writer.flush().map_err(to_write_error)?;
    writer
        .into_inner()
        .map_err(|e| to_write_error(e.into_error()))?
        .sync_all()
        .map_err(to_write_error)
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Create a directory (and parents) if it does not exist yet. Existing
/// contents are left alone.
pub fn create_output_directory(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        debug!("Creating directory {}", path.display());
        fs::create_dir_all(path).map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(path.to_path_buf())
}
