use message_bus::utils::compression::{
    CompressEngine, DefaultCompressEngine, compress_or_fallback,
};
use message_bus::{CompressError, OutgoingPayload, WrappedMessage};
use serde_json::json;

fn wrapped() -> WrappedMessage {
    WrappedMessage {
        correlation_id: "corr-9".to_string(),
        payload: json!({"items": ["a", "b", "c"], "total": 42}),
    }
}

#[tokio::test]
async fn test_gzip_compress_and_decompress() {
    let compressed = DefaultCompressEngine.compress(&wrapped(), "gzip").await.unwrap();

    assert_eq!(compressed.compress_engine, "gzip");
    assert_eq!(DefaultCompressEngine.decompress(&compressed).unwrap(), wrapped());
}

#[tokio::test]
async fn test_engine_name_is_normalized() {
    let compressed = DefaultCompressEngine.compress(&wrapped(), "ZLIB").await.unwrap();
    assert_eq!(compressed.compress_engine, "deflate");
}

#[tokio::test]
async fn test_unknown_engine_is_an_error() {
    let err = DefaultCompressEngine
        .compress(&wrapped(), "lzma")
        .await
        .unwrap_err();

    assert!(matches!(err, CompressError::UnknownEngine(ref name) if name == "lzma"));
    assert_eq!(err.to_string(), "Unknown compress engine: lzma");
}

#[test]
fn test_decompress_rejects_bad_base64() {
    let bad = message_bus::CompressedMessage {
        compress_engine: "gzip".to_string(),
        payload: "%%% not base64 %%%".to_string(),
    };

    assert!(matches!(
        DefaultCompressEngine.decompress(&bad),
        Err(CompressError::Decode(_))
    ));
}

#[tokio::test]
async fn test_fallback_returns_original_message_on_failure() {
    let payload = compress_or_fallback(&DefaultCompressEngine, wrapped(), Some("lzma")).await;

    assert_eq!(payload, OutgoingPayload::Uncompressed(wrapped()));
}

#[tokio::test]
async fn test_fallback_without_engine_name_is_uncompressed() {
    let payload = compress_or_fallback(&DefaultCompressEngine, wrapped(), None).await;
    assert!(!payload.is_compressed());
}

#[tokio::test]
async fn test_fallback_compresses_when_engine_works() {
    let payload = compress_or_fallback(&DefaultCompressEngine, wrapped(), Some("gzip")).await;

    match payload {
        OutgoingPayload::Compressed(message) => {
            assert_eq!(DefaultCompressEngine.decompress(&message).unwrap(), wrapped());
        }
        OutgoingPayload::Uncompressed(_) => panic!("Expected compressed payload"),
    }
}
