// rust/modelstore-core/src/artifact/mod.rs

//! Encoding and decoding of stored model artifacts.
//!
//! An artifact is a length-prefixed bincode header followed by the model
//! payload, optionally compressed with lz4 or zstd. The header carries an
//! XXHash64 checksum of the uncompressed payload, which is verified before
//! the payload is handed to a decoder.

mod format;

pub use format::ArtifactHeader;

use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;

use twox_hash::XxHash64;

use crate::config::ArtifactConfig;
use crate::error::{Result, StoreError};
use crate::model::{Model, ModelRegistry};

/// Settings used when encoding an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOptions {
    pub compression: String,
    pub compression_level: i32,
    pub metadata: HashMap<String, String>,
}

impl Default for ArtifactOptions {
    fn default() -> Self {
        Self::from(&ArtifactConfig::default())
    }
}

impl From<&ArtifactConfig> for ArtifactOptions {
    fn from(config: &ArtifactConfig) -> Self {
        Self {
            compression: config.compression.clone(),
            compression_level: config.compression_level,
            metadata: HashMap::new(),
        }
    }
}

/// Encodes `model` into artifact bytes.
///
/// # Errors
///
/// Returns a serialization error for unknown compression algorithms or
/// when the model cannot be encoded.
pub fn encode_artifact(model: &dyn Model, options: &ArtifactOptions) -> Result<Vec<u8>> {
    let payload = model.encode_payload()?;
    let checksum = calculate_checksum(&payload);
    let compressed = compress(&payload, &options.compression, options.compression_level)?;

    let header = ArtifactHeader::new(
        model.kind(),
        model.schema().clone(),
        options.compression.as_str(),
        payload.len() as u64,
        checksum,
    )
    .with_metadata(options.metadata.clone());

    let header_bytes = bincode::serialize(&header)
        .map_err(|e| StoreError::serialization(format!("failed to serialize header: {e}")))?;

    let header_len = u32::try_from(header_bytes.len())
        .map_err(|_| StoreError::serialization("artifact header too large"))?;
    let mut artifact = Vec::with_capacity(4 + header_bytes.len() + compressed.len());
    artifact.extend_from_slice(&header_len.to_le_bytes());
    artifact.extend_from_slice(&header_bytes);
    artifact.extend_from_slice(&compressed);

    tracing::debug!(
        "Encoded {} model: {} payload bytes, {} stored ({})",
        model.kind(),
        payload.len(),
        compressed.len(),
        options.compression
    );
    Ok(artifact)
}

/// Parses and validates the header of an artifact.
///
/// Returns the header and the offset at which the payload starts. `key`
/// only labels errors.
pub fn read_header(key: &str, data: &[u8]) -> Result<(ArtifactHeader, usize)> {
    let len_bytes: [u8; 4] = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| StoreError::deserialization(key, "artifact too small"))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    let header_bytes = data
        .get(4..4 + header_len)
        .ok_or_else(|| StoreError::deserialization(key, "artifact truncated: header incomplete"))?;

    let header: ArtifactHeader = bincode::deserialize(header_bytes)
        .map_err(|e| StoreError::deserialization(key, format!("failed to deserialize header: {e}")))?;

    if !header.validate_magic() {
        return Err(StoreError::deserialization(
            key,
            format!(
                "invalid magic bytes: expected {:?}, got {:?}",
                ArtifactHeader::MAGIC,
                header.magic
            ),
        ));
    }
    if !header.validate_version() {
        return Err(StoreError::deserialization(
            key,
            format!(
                "unsupported version: expected {}, got {}",
                ArtifactHeader::VERSION,
                header.version
            ),
        ));
    }

    Ok((header, 4 + header_len))
}

/// Decodes artifact bytes into a ready model.
///
/// # Errors
///
/// Returns a deserialization error if the header is invalid, the payload
/// fails its checksum, or no decoder is registered for the model kind.
pub fn decode_artifact(key: &str, data: &[u8], registry: &ModelRegistry) -> Result<Arc<dyn Model>> {
    let (header, offset) = read_header(key, data)?;

    let decoder = registry.decoder(&header.kind).ok_or_else(|| {
        StoreError::deserialization(
            key,
            format!(
                "unknown model kind '{}' (known: {})",
                header.kind,
                registry.kinds().join(", ")
            ),
        )
    })?;

    let payload = decompress(&data[offset..], &header.compression)
        .map_err(|message| StoreError::deserialization(key, message))?;

    if payload.len() as u64 != header.uncompressed_size {
        return Err(StoreError::deserialization(
            key,
            format!(
                "size mismatch: expected {}, got {}",
                header.uncompressed_size,
                payload.len()
            ),
        ));
    }

    let checksum = calculate_checksum(&payload);
    if checksum != header.checksum {
        return Err(StoreError::deserialization(
            key,
            format!("checksum mismatch: expected {}, got {}", header.checksum, checksum),
        ));
    }

    decoder
        .decode(&header.schema, &payload)
        .map_err(|e| StoreError::deserialization(key, e.to_string()))
}

fn compress(data: &[u8], compression: &str, level: i32) -> Result<Vec<u8>> {
    match compression {
        "none" => Ok(data.to_vec()),
        "lz4" => Ok(lz4_flex::compress_prepend_size(data)),
        "zstd" => zstd::encode_all(data, level)
            .map_err(|e| StoreError::serialization(format!("zstd compression failed: {e}"))),
        other => Err(StoreError::serialization(format!(
            "unknown compression algorithm: {other}"
        ))),
    }
}

fn decompress(data: &[u8], compression: &str) -> std::result::Result<Vec<u8>, String> {
    match compression {
        "none" => Ok(data.to_vec()),
        "lz4" => lz4_flex::decompress_size_prepended(data)
            .map_err(|e| format!("lz4 decompression failed: {e}")),
        "zstd" => zstd::decode_all(data).map_err(|e| format!("zstd decompression failed: {e}")),
        other => Err(format!("unknown compression algorithm: {other}")),
    }
}

fn calculate_checksum(data: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(data);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinearModel, ModelSchema};
    use crate::table::Table;

    fn model() -> LinearModel {
        LinearModel::new(ModelSchema::new(["x", "z"], "y"), vec![2.0, -1.0], 0.5).unwrap()
    }

    fn options(compression: &str) -> ArtifactOptions {
        ArtifactOptions {
            compression: compression.to_string(),
            compression_level: 3,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn test_encode_decode_each_compression() {
        let registry = ModelRegistry::default();
        let input = Table::from_rows(["x", "z"], vec![vec![Some("1".into()), Some("4".into())]]).unwrap();

        for compression in ["none", "lz4", "zstd"] {
            let bytes = encode_artifact(&model(), &options(compression)).unwrap();
            let decoded = decode_artifact("m.bin", &bytes, &registry).unwrap();

            assert_eq!(decoded.kind(), "linear");
            assert_eq!(decoded.schema(), model().schema());
            assert_eq!(decoded.predict(&input).unwrap().values, vec![-1.5]);
        }
    }

    #[test]
    fn test_header_keeps_metadata() {
        let mut opts = options("lz4");
        opts.metadata.insert("author".to_string(), "ops".to_string());

        let bytes = encode_artifact(&model(), &opts).unwrap();
        let (header, offset) = read_header("m.bin", &bytes).unwrap();

        assert_eq!(header.metadata.get("author"), Some(&"ops".to_string()));
        assert_eq!(header.compression, "lz4");
        assert!(offset < bytes.len());
    }

    #[test]
    fn test_unknown_compression_rejected() {
        let err = encode_artifact(&model(), &options("brotli")).unwrap_err();
        assert!(matches!(err, StoreError::Serialization { .. }));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = encode_artifact(&model(), &options("none")).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let err = decode_artifact("m.bin", &bytes, &ModelRegistry::default()).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_garbage_is_deserialization_error() {
        let registry = ModelRegistry::default();

        for data in [&b""[..], &b"ab"[..], &b"\x10\x00\x00\x00short"[..], &b"not a model artifact at all"[..]] {
            let err = decode_artifact("junk.pkl", data, &registry).unwrap_err();
            assert!(matches!(err, StoreError::Deserialization { .. }), "{err}");
        }
    }

    #[test]
    fn test_invalid_magic() {
        let bytes = encode_artifact(&model(), &options("none")).unwrap();
        let (mut header, offset) = read_header("m.bin", &bytes).unwrap();
        header.magic = *b"XXXX";

        let header_bytes = bincode::serialize(&header).unwrap();
        let mut forged = (header_bytes.len() as u32).to_le_bytes().to_vec();
        forged.extend_from_slice(&header_bytes);
        forged.extend_from_slice(&bytes[offset..]);

        let err = read_header("m.bin", &forged).unwrap_err();
        assert!(err.to_string().contains("invalid magic"));
    }

    #[test]
    fn test_unknown_kind() {
        let bytes = encode_artifact(&model(), &options("none")).unwrap();
        let err = decode_artifact("m.bin", &bytes, &ModelRegistry::empty()).unwrap_err();
        assert!(err.to_string().contains("unknown model kind 'linear'"));
    }
}
