//! Proton content hash, as the client computes it for resource files.

use std::fs;
use std::path::Path;

use tracing::debug;

/// Proton hash over a byte slice.
pub fn proton(data: &[u8]) -> u32 {
    let mut hash: u32 = 0x5555_5555;
    for &byte in data {
        hash = (hash >> 27)
            .wrapping_add(hash << 5)
            .wrapping_add(u32::from(byte));
    }
    hash
}

/// Proton hash of a file's contents; `0` when the file cannot be read.
pub fn proton_file(path: impl AsRef<Path>) -> u32 {
    let path = path.as_ref();
    let Ok(data) = fs::read(path) else {
        return 0;
    };
    debug!(
        "Calculating proton hash for file '{}' ({} bytes)",
        path.display(),
        data.len()
    );
    proton(&data)
}
