//! Payload compression for wrapped messages.
//!
//! Compression is an optimization: [`compress_or_fallback`] is the only entry
//! point the buses use, and it has no error channel.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use std::io::{Read, Write};
use tracing::{debug, error};

use crate::core::models::{CompressedMessage, OutgoingPayload, WrappedMessage};
use crate::errors::CompressError;

#[async_trait]
pub trait CompressEngine: Send + Sync {
    async fn compress(
        &self,
        message: &WrappedMessage,
        engine: &str,
    ) -> Result<CompressedMessage, CompressError>;
}

/// Algorithms understood by [`DefaultCompressEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Gzip,
    Deflate,
}

impl Algorithm {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Some(Self::Gzip),
            "deflate" | "zlib" => Some(Self::Deflate),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    fn encode(&self, data: &[u8]) -> Result<Vec<u8>, CompressError> {
        match self {
            Self::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Self::Deflate => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
        }
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut out = Vec::new();
        match self {
            Self::Gzip => GzDecoder::new(data).read_to_end(&mut out)?,
            Self::Deflate => ZlibDecoder::new(data).read_to_end(&mut out)?,
        };
        Ok(out)
    }
}

/// flate2-backed engine: JSON-encodes the wrapped message, compresses it and
/// base64 encodes the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCompressEngine;

impl DefaultCompressEngine {
    pub fn decompress(&self, message: &CompressedMessage) -> Result<WrappedMessage, CompressError> {
        let algorithm = Algorithm::parse(&message.compress_engine)
            .ok_or_else(|| CompressError::UnknownEngine(message.compress_engine.clone()))?;
        let raw = STANDARD.decode(message.payload.as_bytes())?;
        let json = algorithm.decode(&raw)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[async_trait]
impl CompressEngine for DefaultCompressEngine {
    async fn compress(
        &self,
        message: &WrappedMessage,
        engine: &str,
    ) -> Result<CompressedMessage, CompressError> {
        let algorithm =
            Algorithm::parse(engine).ok_or_else(|| CompressError::UnknownEngine(engine.to_string()))?;
        let json = serde_json::to_vec(message)?;
        let compressed = algorithm.encode(&json)?;

        Ok(CompressedMessage {
            compress_engine: algorithm.name().to_string(),
            payload: STANDARD.encode(compressed),
        })
    }
}

/// Compresses `message` with `engine_name`, falling back to the uncompressed
/// message on any failure. Failures are logged, never returned.
pub async fn compress_or_fallback(
    engine: &dyn CompressEngine,
    message: WrappedMessage,
    engine_name: Option<&str>,
) -> OutgoingPayload {
    let Some(engine_name) = engine_name else {
        return OutgoingPayload::Uncompressed(message);
    };

    match engine.compress(&message, engine_name).await {
        Ok(compressed) => {
            debug!(
                correlation_id = %message.correlation_id,
                compress_engine = %compressed.compress_engine,
                "Compressed message"
            );
            OutgoingPayload::Compressed(compressed)
        }
        Err(e) => {
            error!(
                correlation_id = %message.correlation_id,
                compress_engine = %engine_name,
                "Failed to compress message, sending uncompressed: {}",
                e
            );
            OutgoingPayload::Uncompressed(message)
        }
    }
}
