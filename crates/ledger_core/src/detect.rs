use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Computes a fixed-length digest of item content for equality comparison.
pub trait ChangeDetector: Send + Sync {
    fn digest(&self, content: &str) -> String;
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of the content.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256ChangeDetector;

impl ChangeDetector for Sha256ChangeDetector {
    fn digest(&self, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest.iter() {
            let _ = write!(&mut hex, "{byte:02x}");
        }
        hex
    }
}
