use crate::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Digest length in bytes (128 bits).
pub const FINGERPRINT_LEN: usize = 16;

const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Content identity of a file, used for change detection only.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// Stream a file through BLAKE3 and keep the first 128 bits of its
/// extended output. The file is never loaded into memory whole.
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, Error> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    fingerprint_reader(BufReader::with_capacity(READ_BUFFER_SIZE, file))
        .map_err(|e| Error::io(path, e))
}

pub fn fingerprint_reader<R: io::Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher)?;

    let mut digest = [0u8; FINGERPRINT_LEN];
    hasher.finalize_xof().fill(&mut digest);
    Ok(Fingerprint(digest))
}
