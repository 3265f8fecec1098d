// rust/modelstore-core/src/artifact/format.rs

//! Model artifact file format.
//!
//! ```text
//! +-------------------+
//! | Header length     |  <- u32, little endian
//! +-------------------+
//! | Header (bincode)  |  <- ArtifactHeader serialized with bincode
//! +-------------------+
//! | Payload           |  <- model parameters, compressed per header
//! +-------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ModelSchema;

/// Header of a model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Magic bytes ("MSMA")
    pub magic: [u8; 4],
    /// Format version number
    pub version: u32,
    /// Model kind, used to pick a decoder
    pub kind: String,
    /// Compression algorithm used ("none", "lz4", or "zstd")
    pub compression: String,
    /// Size of the payload before compression
    pub uncompressed_size: u64,
    /// XXHash64 checksum of the uncompressed payload
    pub checksum: u64,
    pub schema: ModelSchema,
    /// User-defined metadata
    pub metadata: HashMap<String, String>,
}

impl ArtifactHeader {
    pub const MAGIC: [u8; 4] = *b"MSMA";

    pub const VERSION: u32 = 1;

    pub fn new(
        kind: impl Into<String>,
        schema: ModelSchema,
        compression: impl Into<String>,
        uncompressed_size: u64,
        checksum: u64,
    ) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            kind: kind.into(),
            compression: compression.into(),
            uncompressed_size,
            checksum,
            schema,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn validate_magic(&self) -> bool {
        self.magic == Self::MAGIC
    }

    pub fn validate_version(&self) -> bool {
        self.version == Self::VERSION
    }
}
