//! Encrypt a payload to a file, and decrypt one back into memory.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use zeroize::Zeroizing;

use super::envelope;
use super::keys::{Identity, Recipient};
use crate::errors::Result;

/// Encrypt `plaintext` to `recipient` and write it to `dest`.
///
/// The ciphertext is written to a temp file next to `dest` and renamed
/// over it, so a failed write never leaves a truncated `dest` behind.
pub fn seal_to_file(plaintext: &[u8], recipient: &Recipient, dest: &Path) -> Result<()> {
    let ciphertext = envelope::encrypt(plaintext, recipient)?;

    let parent = dest.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        dest.file_name().unwrap_or_default().to_string_lossy()
    ));

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(&ciphertext)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&tmp_path, dest)) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Read an encrypted payload from `reader` and decrypt it with `identity`.
///
/// Authentication failures are `DecryptionFailed`; read failures are `Io`.
pub fn open<R: Read>(mut reader: R, identity: &Identity) -> Result<Zeroizing<Vec<u8>>> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    Ok(Zeroizing::new(envelope::decrypt(&data, identity)?))
}
