//! Expands downloaded ZIP archives next to where they were saved.

use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::Path,
};

use zip::ZipArchive;

use crate::error::{FetchError, Result};

/// Directory, beside the archive, that receives its members.
pub const EXPANSION_DIR: &str = "shapefiles";

/// Extracts every member of the archive into `{archive_parent}/shapefiles`.
///
/// Returns the member names in archive order. Existing files are overwritten.
pub fn expand(archive_path: &Path) -> Result<Vec<String>> {
    let destination = archive_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(EXPANSION_DIR);

    expand_into(archive_path, &destination)
}

pub fn expand_into(archive_path: &Path, destination: &Path) -> Result<Vec<String>> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    fs::create_dir_all(destination)?;

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| FetchError::UnsafeEntry(entry.name().to_string()))?;
        let out_path = destination.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = File::create(&out_path)?;
            io::copy(&mut entry, &mut out_file)?;
        }

        names.push(entry.name().to_string());
    }

    Ok(names)
}

// -- Tests -------------------------------------------------------------------
