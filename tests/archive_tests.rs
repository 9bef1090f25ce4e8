//! Integration tests for the archive codec.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;
use vaultlock::archive::{self, ArchiveFormat};
use vaultlock::errors::VaultError;

fn build_tree(root: &Path) {
    fs::create_dir_all(root.join("a/b/c")).unwrap();
    fs::create_dir_all(root.join("hollow")).unwrap();
    fs::write(root.join("readme.txt"), b"hello").unwrap();
    fs::write(root.join("a/b/c/deep.bin"), vec![7u8; 100_000]).unwrap();
    fs::write(root.join("a/empty"), b"").unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(root.join("readme.txt"), fs::Permissions::from_mode(0o640)).unwrap();
        fs::set_permissions(root.join("a/empty"), fs::Permissions::from_mode(0o700)).unwrap();
    }
}

/// Relative path -> (contents, permission bits); directories map to `None`.
fn snapshot(root: &Path) -> BTreeMap<String, Option<(Vec<u8>, u32)>> {
    let mut out = BTreeMap::new();
    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
        let value = if entry.file_type().is_dir() {
            None
        } else {
            Some((fs::read(entry.path()).unwrap(), mode(entry.path())))
        };
        out.insert(rel, value);
    }
    out
}

#[cfg(unix)]
fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn mode(_path: &Path) -> u32 {
    0
}

#[test]
fn tar_round_trip_preserves_tree_and_modes() {
    let src = TempDir::new().unwrap();
    let root = src.path().join("box");
    build_tree(&root);

    let data = archive::pack(&root, ArchiveFormat::Tar).unwrap();
    assert_eq!(archive::detect_format(&data), Some(ArchiveFormat::Tar));

    let out = TempDir::new().unwrap();
    assert_eq!(archive::unpack(&data, out.path(), "box").unwrap(), ArchiveFormat::Tar);
    assert_eq!(snapshot(&out.path().join("box")), snapshot(&root));
}

#[test]
fn zip_round_trip_preserves_tree_and_modes() {
    let src = TempDir::new().unwrap();
    let root = src.path().join("box");
    build_tree(&root);

    let data = archive::pack(&root, ArchiveFormat::Zip).unwrap();
    assert_eq!(archive::detect_format(&data), Some(ArchiveFormat::Zip));

    let out = TempDir::new().unwrap();
    assert_eq!(archive::unpack(&data, out.path(), "box").unwrap(), ArchiveFormat::Zip);
    assert_eq!(snapshot(&out.path().join("box")), snapshot(&root));
}

#[test]
fn both_formats_extract_to_the_same_tree() {
    let src = TempDir::new().unwrap();
    let root = src.path().join("box");
    build_tree(&root);

    let from_tar = TempDir::new().unwrap();
    let from_zip = TempDir::new().unwrap();
    archive::unpack(&archive::pack(&root, ArchiveFormat::Tar).unwrap(), from_tar.path(), "box").unwrap();
    archive::unpack(&archive::pack(&root, ArchiveFormat::Zip).unwrap(), from_zip.path(), "box").unwrap();

    assert_eq!(snapshot(from_tar.path()), snapshot(from_zip.path()));
}

#[test]
fn entries_are_rooted_at_directory_name() {
    let src = TempDir::new().unwrap();
    let root = src.path().join(".hidden");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("x"), b"x").unwrap();

    let data = archive::pack(&root, ArchiveFormat::Tar).unwrap();
    let out = TempDir::new().unwrap();
    archive::unpack(&data, out.path(), ".hidden").unwrap();
    assert_eq!(fs::read(out.path().join(".hidden/x")).unwrap(), b"x");
}

#[test]
fn absolute_tar_entry_is_rejected() {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(3);
    header.set_mode(0o644);
    let raw = b"/tmp/abs.txt";
    header.as_old_mut().name[..raw.len()].copy_from_slice(raw);
    header.set_cksum();
    builder.append(&header, &b"abs"[..]).unwrap();
    let data = builder.into_inner().unwrap();

    let out = TempDir::new().unwrap();
    let err = archive::unpack(&data, out.path(), "box").unwrap_err();
    assert!(matches!(err, VaultError::UnsafeEntryPath(_)));
}

#[cfg(unix)]
#[test]
fn symlinks_are_not_archived() {
    let src = TempDir::new().unwrap();
    let root = src.path().join("box");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("real.txt"), b"real").unwrap();
    std::os::unix::fs::symlink("/etc/hostname", root.join("link")).unwrap();

    for format in [ArchiveFormat::Tar, ArchiveFormat::Zip] {
        let out = TempDir::new().unwrap();
        archive::unpack(&archive::pack(&root, format).unwrap(), out.path(), "box").unwrap();
        assert!(out.path().join("box/real.txt").exists());
        assert!(fs::symlink_metadata(out.path().join("box/link")).is_err());
    }
}

#[test]
fn entries_outside_the_vault_root_are_rejected_before_writing() {
    let src = TempDir::new().unwrap();
    let root = src.path().join("box");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("inner.txt"), b"inner").unwrap();

    // A well-formed archive whose root is another directory.
    let data = archive::pack(&root, ArchiveFormat::Tar).unwrap();
    let out = TempDir::new().unwrap();
    let err = archive::unpack(&data, out.path(), "other").unwrap_err();
    assert!(matches!(err, VaultError::UnsafeEntryPath(_)));
    assert!(!out.path().join("box").exists());

    // A sibling file next to the vault, e.g. its own encrypted file.
    let mut builder = tar::Builder::new(Vec::new());
    let mut dir = tar::Header::new_ustar();
    dir.set_entry_type(tar::EntryType::Directory);
    dir.set_size(0);
    dir.set_mode(0o755);
    builder.append_data(&mut dir, "box/", std::io::empty()).unwrap();
    let mut sibling = tar::Header::new_ustar();
    sibling.set_entry_type(tar::EntryType::Regular);
    sibling.set_size(4);
    sibling.set_mode(0o644);
    builder.append_data(&mut sibling, "box.age", &b"junk"[..]).unwrap();
    let data = builder.into_inner().unwrap();

    fs::write(out.path().join("box.age"), b"ciphertext").unwrap();
    let err = archive::unpack(&data, out.path(), "box").unwrap_err();
    assert!(matches!(err, VaultError::UnsafeEntryPath(_)));
    assert_eq!(fs::read(out.path().join("box.age")).unwrap(), b"ciphertext");
    assert!(!out.path().join("box").exists());
}
