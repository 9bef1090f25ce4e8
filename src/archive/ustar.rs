//! Tar (ustar) container, the current format.

use std::fs;
use std::io;

use tar::{Archive, Builder, EntryType, Header};

use super::{extract_dir, extract_file, EntryGuard, SourceEntry};
use crate::errors::{Result, VaultError};

fn archive_err(e: io::Error) -> VaultError {
    VaultError::Archive(format!("tar: {e}"))
}

pub(super) fn write(entries: &[SourceEntry]) -> Result<Vec<u8>> {
    let mut builder = Builder::new(Vec::new());

    for entry in entries {
        let mut header = Header::new_ustar();
        header.set_mode(entry.mode);
        header.set_mtime(entry.mtime);

        if entry.is_dir {
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder
                .append_data(&mut header, format!("{}/", entry.name), io::empty())
                .map_err(archive_err)?;
        } else {
            let data = fs::read(&entry.path)?;
            header.set_entry_type(EntryType::Regular);
            header.set_size(data.len() as u64);
            builder
                .append_data(&mut header, &entry.name, data.as_slice())
                .map_err(archive_err)?;
        }
    }

    builder.into_inner().map_err(archive_err)
}

pub(super) fn extract(data: &[u8], guard: &EntryGuard<'_>) -> Result<()> {
    // Validate every entry before touching the filesystem.
    let mut archive = Archive::new(data);
    for entry in archive.entries().map_err(archive_err)? {
        let entry = entry.map_err(archive_err)?;
        let name = entry.path().map_err(archive_err)?;
        guard.resolve(&name.to_string_lossy())?;
    }

    let mut archive = Archive::new(data);
    for entry in archive.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        let name = entry.path().map_err(archive_err)?.to_string_lossy().into_owned();
        let target = guard.resolve(&name)?;
        let entry_type = entry.header().entry_type();

        if entry_type.is_dir() {
            extract_dir(&target)?;
        } else if entry_type.is_file() {
            let mode = entry.header().mode().map_err(archive_err)? & 0o7777;
            extract_file(&target, &mut entry, mode)?;
        } else {
            tracing::warn!(entry = %name, ?entry_type, "skipping non-regular tar entry");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{pack, unpack, ArchiveFormat};
    use tempfile::TempDir;

    #[test]
    fn entries_are_rooted_at_directory_name() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("box");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/file.txt"), b"hi").unwrap();

        let data = pack(&root, ArchiveFormat::Tar).unwrap();
        let mut archive = Archive::new(data.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["box", "box/sub", "box/sub/file.txt"]);
    }

    #[test]
    fn traversal_entry_writes_nothing() {
        let mut builder = Builder::new(Vec::new());

        let mut ok = Header::new_ustar();
        ok.set_entry_type(EntryType::Regular);
        ok.set_size(4);
        ok.set_mode(0o644);
        builder.append_data(&mut ok, "box/good.txt", &b"good"[..]).unwrap();

        // `append_data` refuses `..`, so forge the name in the raw header.
        let mut evil = Header::new_ustar();
        evil.set_entry_type(EntryType::Regular);
        evil.set_size(4);
        evil.set_mode(0o644);
        let raw = b"../evil";
        evil.as_old_mut().name[..raw.len()].copy_from_slice(raw);
        evil.set_cksum();
        builder.append(&evil, &b"evil"[..]).unwrap();

        let data = builder.into_inner().unwrap();

        let parent = TempDir::new().unwrap();
        let dest = parent.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let err = unpack(&data, &dest, "box").unwrap_err();
        assert!(matches!(err, VaultError::UnsafeEntryPath(_)));
        assert!(!parent.path().join("evil").exists());
        assert!(!dest.join("box/good.txt").exists());
    }
}
