use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{PublishError, PublishResult};

/// Gzip an OMF body for endpoints configured with `use_compression`.
pub fn gzip(data: &[u8]) -> PublishResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PublishError::config(format!("gzip compression failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| PublishError::config(format!("gzip finalization failed: {}", e)))
}

#[cfg(test)]
pub fn gunzip(data: &[u8]) -> PublishResult<Vec<u8>> {
    use std::io::Read;

    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| PublishError::config(format!("gzip decompression failed: {}", e)))?;
    Ok(decompressed)
}
