//! Archive codec: flatten a directory tree into one byte stream and back.
//!
//! Two container formats are understood:
//! - **Tar** (ustar, current): written by `lock`.
//! - **Zip** (legacy): still extracted, with an advisory.
//!
//! The format of a payload is always sniffed from its leading bytes.
//! Entry names are rooted at the archived directory's own name
//! (`box/`, `box/notes.txt`), so extracting into the parent directory
//! recreates the vault in place.

mod legacy_zip;
mod ustar;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{Result, VaultError};

/// Local file header magic of a zip archive.
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Offset and value of the ustar magic in the first tar header.
const USTAR_MAGIC_OFFSET: usize = 257;
const USTAR_MAGIC: &[u8; 5] = b"ustar";

/// Mode given to extracted files whose entry records none.
pub(crate) const DEFAULT_FILE_MODE: u32 = 0o644;

/// Supported container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Legacy zip container.
    Zip,
    /// Current ustar container.
    Tar,
}

impl ArchiveFormat {
    pub fn is_legacy(self) -> bool {
        self == Self::Zip
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => f.write_str("zip"),
            Self::Tar => f.write_str("tar"),
        }
    }
}

/// Sniff the container format from the leading bytes of `data`.
///
/// Works on a borrowed slice, so the payload is untouched for the real
/// decode that follows.
pub fn detect_format(data: &[u8]) -> Option<ArchiveFormat> {
    let end = USTAR_MAGIC_OFFSET + USTAR_MAGIC.len();
    if data.len() >= end && &data[USTAR_MAGIC_OFFSET..end] == USTAR_MAGIC {
        return Some(ArchiveFormat::Tar);
    }
    if data.starts_with(ZIP_MAGIC) {
        return Some(ArchiveFormat::Zip);
    }
    None
}

/// Serialize the directory `dir` into an archive of the given format.
///
/// Aborts on the first error; nothing is returned for a partial walk.
pub fn pack(dir: &Path, format: ArchiveFormat) -> Result<Vec<u8>> {
    let entries = collect_entries(dir)?;
    tracing::debug!(dir = %dir.display(), entries = entries.len(), %format, "packing directory");
    match format {
        ArchiveFormat::Tar => ustar::write(&entries),
        ArchiveFormat::Zip => legacy_zip::write(&entries),
    }
}

/// Extract `data` into `dest`, returning the format that was detected.
///
/// Every entry must resolve inside `dest/<root>`.  All entry paths are
/// validated before anything is written, so a single stray entry fails
/// the whole extraction with nothing on disk.
pub fn unpack(data: &[u8], dest: &Path, root: &str) -> Result<ArchiveFormat> {
    let format = detect_format(data).ok_or(VaultError::UnknownArchiveFormat)?;
    tracing::debug!(dest = %dest.display(), root, %format, "unpacking archive");
    let guard = EntryGuard { dest, root };
    match format {
        ArchiveFormat::Tar => ustar::extract(data, &guard)?,
        ArchiveFormat::Zip => legacy_zip::extract(data, &guard)?,
    }
    Ok(format)
}

/// Confines extracted entries to one top-level directory under `dest`.
pub(crate) struct EntryGuard<'a> {
    dest: &'a Path,
    root: &'a str,
}

impl EntryGuard<'_> {
    /// Target path for `entry_name`, or `UnsafeEntryPath` if it escapes
    /// `dest` or lands outside the root directory.
    pub(crate) fn resolve(&self, entry_name: &str) -> Result<PathBuf> {
        let target = safe_join(self.dest, entry_name)?;
        let first = target
            .strip_prefix(self.dest)
            .ok()
            .and_then(|rel| rel.components().next());
        match first {
            Some(Component::Normal(part)) if part == self.root => Ok(target),
            _ => Err(VaultError::UnsafeEntryPath(format!(
                "{entry_name} (outside {}/)",
                self.root
            ))),
        }
    }
}

/// Resolve `entry_name` under `dest`, rejecting anything that would land
/// outside it (absolute paths, `..` escapes) or on `dest` itself.
pub fn safe_join(dest: &Path, entry_name: &str) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    let mut depth = 0usize;

    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => {
                relative.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return Err(VaultError::UnsafeEntryPath(entry_name.to_string()));
                }
                relative.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(VaultError::UnsafeEntryPath(entry_name.to_string()));
            }
        }
    }

    if depth == 0 {
        return Err(VaultError::UnsafeEntryPath(entry_name.to_string()));
    }
    Ok(dest.join(relative))
}

// ---------------------------------------------------------------------------
// Shared helpers for the format modules
// ---------------------------------------------------------------------------

/// One filesystem entry to be archived.
pub(crate) struct SourceEntry {
    pub path: PathBuf,
    /// `/`-separated name rooted at the archived directory's name.
    pub name: String,
    pub is_dir: bool,
    pub mode: u32,
    pub mtime: u64,
}

fn collect_entries(dir: &Path) -> Result<Vec<SourceEntry>> {
    if !dir.is_dir() {
        return Err(VaultError::Archive(format!(
            "{} does not exist or is not a directory",
            dir.display()
        )));
    }
    let root_name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            VaultError::Archive(format!("cannot derive an entry name from {}", dir.display()))
        })?
        .to_string();

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| VaultError::Archive(format!("walk failed: {e}")))?;
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            tracing::warn!(path = %entry.path().display(), "skipping symlink or special file");
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| VaultError::Archive(format!("walk left the root: {e}")))?;
        let mut name = root_name.clone();
        for part in relative.components() {
            let part = part.as_os_str().to_str().ok_or_else(|| {
                VaultError::Archive(format!("non UTF-8 path {}", entry.path().display()))
            })?;
            name.push('/');
            name.push_str(part);
        }

        let meta = entry
            .metadata()
            .map_err(|e| VaultError::Archive(format!("stat failed: {e}")))?;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());

        entries.push(SourceEntry {
            path: entry.into_path(),
            name,
            is_dir: file_type.is_dir(),
            mode: mode_of(&meta),
            mtime,
        });
    }
    Ok(entries)
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => DEFAULT_FILE_MODE,
    }
}

/// Create a directory entry (and any missing parents).
pub(crate) fn extract_dir(target: &Path) -> Result<()> {
    fs::create_dir_all(target)?;
    Ok(())
}

/// Write a file entry, creating parents as needed, and restore its mode.
pub(crate) fn extract_file<R: Read>(target: &Path, contents: &mut R, mode: u32) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode | 0o200);
    }

    {
        let mut file = options.open(target)?;
        io::copy(contents, &mut file)?;
    }
    set_mode(target, mode)?;
    Ok(())
}

#[cfg(unix)]
fn set_mode(target: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(target, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(target: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(target)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(target, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn detects_zip_magic() {
        assert_eq!(detect_format(b"PK\x03\x04rest"), Some(ArchiveFormat::Zip));
    }

    #[test]
    fn detects_ustar_magic_at_offset() {
        let mut block = vec![0u8; 512];
        block[257..262].copy_from_slice(b"ustar");
        assert_eq!(detect_format(&block), Some(ArchiveFormat::Tar));
    }

    #[test]
    fn unknown_and_short_payloads_are_not_detected() {
        assert_eq!(detect_format(b""), None);
        assert_eq!(detect_format(b"PK"), None);
        assert_eq!(detect_format(&[0u8; 600]), None);
    }

    #[test]
    fn detection_does_not_consume_input() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("box");
        fs::create_dir(&root).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();

        let data = pack(&root, ArchiveFormat::Tar).unwrap();
        assert_eq!(detect_format(&data), Some(ArchiveFormat::Tar));
        assert_eq!(detect_format(&data), Some(ArchiveFormat::Tar));

        let out = TempDir::new().unwrap();
        assert_eq!(unpack(&data, out.path(), "box").unwrap(), ArchiveFormat::Tar);
        assert_eq!(fs::read(out.path().join("box/a.txt")).unwrap(), b"alpha");
    }

    #[test]
    fn safe_join_accepts_nested_names() {
        let dest = Path::new("/tmp/dest");
        assert_eq!(
            safe_join(dest, "box/a/../b.txt").unwrap(),
            PathBuf::from("/tmp/dest/box/b.txt")
        );
        assert_eq!(
            safe_join(dest, "./box/").unwrap(),
            PathBuf::from("/tmp/dest/box")
        );
    }

    #[test]
    fn safe_join_rejects_escapes() {
        let dest = Path::new("/tmp/dest");
        for name in ["../evil", "box/../../evil", "/etc/passwd", "", ".", "box/.."] {
            assert!(
                matches!(safe_join(dest, name), Err(VaultError::UnsafeEntryPath(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn guard_confines_entries_to_root() {
        let dest = Path::new("/tmp/dest");
        let guard = EntryGuard { dest, root: "box" };

        assert_eq!(guard.resolve("box").unwrap(), PathBuf::from("/tmp/dest/box"));
        assert_eq!(
            guard.resolve("box/a/b.txt").unwrap(),
            PathBuf::from("/tmp/dest/box/a/b.txt")
        );
        for name in ["box.age", "other/a.txt", "boxer/a.txt", "box/../other", "../box"] {
            assert!(
                matches!(guard.resolve(name), Err(VaultError::UnsafeEntryPath(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn pack_rejects_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = pack(&dir.path().join("missing"), ArchiveFormat::Tar).unwrap_err();
        assert!(matches!(err, VaultError::Archive(_)));
    }

    #[test]
    fn unpack_rejects_unknown_format() {
        let out = TempDir::new().unwrap();
        let err = unpack(b"definitely not an archive", out.path(), "box").unwrap_err();
        assert!(matches!(err, VaultError::UnknownArchiveFormat));
    }
}
