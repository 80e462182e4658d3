//! Compression applied before encryption, per `Compression::{None, Gzip}`.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;

use askexperts_types::Compression;

use crate::{CryptoError, CryptoResult};

pub fn compress(bytes: &[u8], method: Compression) -> CryptoResult<Vec<u8>> {
    match method {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
            encoder
                .write_all(bytes)
                .map_err(|e| CryptoError::DecryptFailure(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CryptoError::DecryptFailure(e.to_string()))
        }
    }
}

pub fn decompress(bytes: &[u8], method: Compression) -> CryptoResult<Vec<u8>> {
    match method {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut decoder = GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| CryptoError::DecryptFailure(e.to_string()))?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(4);
        let compressed = compress(&original, Compression::Gzip).unwrap();
        assert!(compressed.len() < original.len());
        let restored = decompress(&compressed, Compression::Gzip).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn none_is_identity() {
        let original = b"passthrough".to_vec();
        let out = compress(&original, Compression::None).unwrap();
        assert_eq!(out, original);
    }
}
