//! Zip container, the legacy format.
//!
//! Vaults locked by older releases hold a zip payload.  It is still
//! written here so tooling and tests can produce one, but `lock` never
//! chooses it.

use std::io::{Cursor, Write};

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::{extract_dir, extract_file, EntryGuard, SourceEntry, DEFAULT_FILE_MODE};
use crate::errors::{Result, VaultError};

/// File-type bits of a unix mode.
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

fn archive_err(e: ZipError) -> VaultError {
    VaultError::Archive(format!("zip: {e}"))
}

pub(super) fn write(entries: &[SourceEntry]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for entry in entries {
        let options = SimpleFileOptions::default().unix_permissions(entry.mode);
        if entry.is_dir {
            writer
                .add_directory(format!("{}/", entry.name), options)
                .map_err(archive_err)?;
        } else {
            let data = std::fs::read(&entry.path)?;
            writer
                .start_file(entry.name.as_str(), options)
                .map_err(archive_err)?;
            writer.write_all(&data)?;
        }
    }

    Ok(writer.finish().map_err(archive_err)?.into_inner())
}

pub(super) fn extract(data: &[u8], guard: &EntryGuard<'_>) -> Result<()> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(archive_err)?;

    // Validate every entry before touching the filesystem.
    for name in archive.file_names() {
        guard.resolve(name)?;
    }

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(archive_err)?;
        let name = file.name().to_string();
        let target = guard.resolve(&name)?;

        if file.is_dir() {
            extract_dir(&target)?;
            continue;
        }

        let mode = file.unix_mode();
        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            tracing::warn!(entry = %name, "skipping symlink zip entry");
            continue;
        }
        let mode = mode.map_or(DEFAULT_FILE_MODE, |m| m & 0o7777);
        extract_file(&target, &mut file, mode)?;
    }
    Ok(())
}
