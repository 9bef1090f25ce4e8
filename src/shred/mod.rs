//! Secure erasure: overwrite file contents with random data before removal.
//!
//! Each pass rewrites the whole file from offset 0 and is synced to disk
//! before the next one starts, so earlier passes cannot be collapsed by
//! write buffering.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rand::RngCore;
use walkdir::WalkDir;

use crate::errors::{Result, VaultError};

/// Random data is generated and written in chunks of this size.
const CHUNK_LEN: usize = 64 * 1024;

/// A write target whose contents can be forced to durable storage.
pub trait DurableSink: Write + Seek {
    fn sync(&mut self) -> io::Result<()>;
}

impl DurableSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Overwrite the first `len` bytes of `sink` with fresh random data,
/// `iterations` times.  Stops at the first I/O error.
pub fn overwrite<S: DurableSink>(sink: &mut S, len: u64, iterations: u32) -> io::Result<()> {
    let mut rng = rand::rng();
    let mut buf = vec![0u8; CHUNK_LEN];

    for _ in 0..iterations {
        sink.seek(SeekFrom::Start(0))?;
        let mut remaining = len;
        while remaining > 0 {
            let n = usize::try_from(remaining).map_or(CHUNK_LEN, |r| r.min(CHUNK_LEN));
            rng.fill_bytes(&mut buf[..n]);
            sink.write_all(&buf[..n])?;
            remaining -= n as u64;
        }
        sink.flush()?;
        sink.sync()?;
    }
    Ok(())
}

/// Overwrite `path` with random data `iterations` times, then remove it.
///
/// On error the remaining passes are skipped and the file may still exist.
pub fn shred_file(path: &Path, iterations: u32) -> Result<()> {
    ensure_writable(path)?;
    {
        let mut file = OpenOptions::new().write(true).open(path)?;
        let len = file.metadata()?.len();
        overwrite(&mut file, len, iterations)?;
    }
    fs::remove_file(path)?;
    tracing::debug!(path = %path.display(), iterations, "shredded file");
    Ok(())
}

/// Result of shredding a directory whose tree was removed.
#[derive(Debug, Default)]
pub struct ShredReport {
    /// Files overwritten before removal.
    pub shredded: Vec<PathBuf>,
    /// Files (or unreadable entries) that could not be overwritten;
    /// they were removed with the tree but their data was not destroyed.
    pub survivors: Vec<PathBuf>,
}

impl ShredReport {
    pub fn is_complete(&self) -> bool {
        self.survivors.is_empty()
    }
}

/// Shred every regular file under `path`, then remove the whole tree.
///
/// Per-file failures do not stop the walk; they are collected in the
/// report.  Symlinks and special files are not overwritten.  Failing to
/// remove the tree is the only error once the walk has started.
pub fn shred_dir(path: &Path, iterations: u32) -> Result<ShredReport> {
    let meta = fs::symlink_metadata(path)
        .map_err(|_| VaultError::MissingVault(path.display().to_string()))?;
    if !meta.is_dir() {
        return Err(VaultError::MissingVault(format!(
            "{} (not a directory)",
            path.display()
        )));
    }

    let report = shred_tree(path, |file| shred_file(file, iterations));
    fs::remove_dir_all(path)?;
    Ok(report)
}

/// Run `shred` on every regular file under `path`, recording each file as
/// shredded or surviving.  A failure never stops the walk.
fn shred_tree<F>(path: &Path, mut shred: F) -> ShredReport
where
    F: FnMut(&Path) -> Result<()>,
{
    let mut report = ShredReport::default();
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "could not walk entry while shredding");
                if let Some(p) = e.path() {
                    report.survivors.push(p.to_path_buf());
                }
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match shred(entry.path()) {
            Ok(()) => report.shredded.push(entry.into_path()),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "could not shred file");
                report.survivors.push(entry.into_path());
            }
        }
    }
    report
}

/// Give the owner write access so read-only files can be overwritten.
fn ensure_writable(path: &Path) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    let mut perms = meta.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = perms.mode();
        if mode & 0o200 == 0 {
            perms.set_mode(mode | 0o200);
            fs::set_permissions(path, perms)?;
        }
    }

    #[cfg(not(unix))]
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}
