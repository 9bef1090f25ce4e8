//! Integration tests for the vaultlock CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.  The
//! passphrase is supplied through `VAULTLOCK_PASSPHRASE` and a
//! `.vaultlock.toml` lowers the Argon2 cost so the suite stays fast.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: get a Command pointing at the vaultlock binary.
fn vaultlock() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("vaultlock").expect("binary should exist")
}

/// A temp workspace with cheap KDF settings.
fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child(".vaultlock.toml")
        .write_str(
            "argon2_memory_kib = 8192\n\
             argon2_iterations = 1\n\
             argon2_parallelism = 1\n",
        )
        .unwrap();
    tmp
}

/// Run `vaultlock <name> <action>` inside `dir` with a fixed passphrase.
fn run_in(dir: &TempDir, name: &str, action: &str) -> assert_cmd::assert::Assert {
    vaultlock()
        .current_dir(dir.path())
        .env("VAULTLOCK_PASSPHRASE", "correct horse battery staple")
        .args([name, action])
        .assert()
}

fn identity_files(dir: &TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".key.age"))
        .collect()
}

#[test]
fn version_flag_shows_version() {
    vaultlock()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vaultlock"));
}

#[test]
fn no_args_shows_usage_and_exits_zero() {
    vaultlock()
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn unknown_action_shows_usage_and_exits_zero() {
    vaultlock()
        .args(["box", "explode"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn keygen_lock_unlock_cycle() {
    let tmp = workspace();
    tmp.child("box/notes.txt").write_str("top secret").unwrap();
    tmp.child("box/nested/deep.txt").write_str("deeper").unwrap();

    run_in(&tmp, "box", "keygen")
        .success()
        .stdout(predicate::str::contains("CREATED (do not change the filename)"));
    let ids = identity_files(&tmp);
    assert_eq!(ids.len(), 1);
    assert!(ids[0].ends_with(".box.key.age"));

    run_in(&tmp, "box", "lock")
        .success()
        .stdout(predicate::str::contains("box SECURED with"));
    tmp.child("box").assert(predicate::path::missing());
    tmp.child("box.age").assert(predicate::path::is_file());

    run_in(&tmp, "box", "unlock")
        .success()
        .stdout(predicate::str::contains("box DECRYPTED"));
    tmp.child("box.age").assert(predicate::path::missing());
    tmp.child("box/notes.txt").assert("top secret");
    tmp.child("box/nested/deep.txt").assert("deeper");
}

#[test]
fn trailing_separator_in_name_is_ignored() {
    let tmp = workspace();
    tmp.child("box/a.txt").write_str("a").unwrap();

    run_in(&tmp, "box/", "keygen").success();
    run_in(&tmp, "box/", "lock")
        .success()
        .stdout(predicate::str::contains("box SECURED with"));
    tmp.child("box.age").assert(predicate::path::is_file());
}

#[test]
fn lock_without_identity_fails() {
    let tmp = workspace();
    tmp.child("box/a.txt").write_str("a").unwrap();

    run_in(&tmp, "box", "lock")
        .code(1)
        .stdout(predicate::str::contains("error:"));
    tmp.child("box/a.txt").assert("a");
}

#[test]
fn unlock_without_locked_file_fails() {
    let tmp = workspace();
    run_in(&tmp, "box", "keygen").success();

    run_in(&tmp, "box", "unlock")
        .code(1)
        .stdout(predicate::str::contains("error:"));
}

#[test]
fn second_keygen_is_refused() {
    let tmp = workspace();
    run_in(&tmp, "box", "keygen").success();
    run_in(&tmp, "box", "keygen")
        .code(1)
        .stdout(predicate::str::contains("error:"));
    assert_eq!(identity_files(&tmp).len(), 1);
}

#[test]
fn wrong_passphrase_keeps_ciphertext() {
    let tmp = workspace();
    tmp.child("box/a.txt").write_str("a").unwrap();
    run_in(&tmp, "box", "keygen").success();
    run_in(&tmp, "box", "lock").success();

    vaultlock()
        .current_dir(tmp.path())
        .env("VAULTLOCK_PASSPHRASE", "not the passphrase")
        .args(["box", "unlock"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("error:"));
    tmp.child("box.age").assert(predicate::path::is_file());
    tmp.child("box").assert(predicate::path::missing());
}

#[test]
fn name_of_only_dots_is_rejected() {
    let tmp = workspace();
    run_in(&tmp, "..", "keygen")
        .code(1)
        .stdout(predicate::str::contains("error:"));
    assert!(identity_files(&tmp).is_empty());
}
