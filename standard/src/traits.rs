use bytes::Bytes;

/// Compresses a sub-entry batch prior to it being framed into a chunk entry.
///
/// Implemented by each supported [`CompressionType`](stream_protocol::Chunk)
/// member; the `none` variant is the identity compressor used when
/// a sub-entry's compression type byte is `0`.
pub trait Compress {
    fn compress(&self, bytes: Bytes) -> anyhow::Result<Bytes>;
}

/// The decompression counterpart to [`Compress`], used by the chunk reader
/// once a sub-entry's compression type has been read off its header byte.
pub trait Decompress {
    fn decompress(&self, bytes: Bytes, uncompressed_size: u32) -> anyhow::Result<Bytes>;
}

/// Identity compressor for uncompressed sub-entry batches.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompression;

impl Compress for NoopCompression {
    fn compress(&self, bytes: Bytes) -> anyhow::Result<Bytes> {
        Ok(bytes)
    }
}

impl Decompress for NoopCompression {
    fn decompress(&self, bytes: Bytes, _uncompressed_size: u32) -> anyhow::Result<Bytes> {
        Ok(bytes)
    }
}

#[cfg(feature = "compression")]
pub mod gzip {
    use super::{Compress, Decompress};
    use anyhow::Context;
    use bytes::Bytes;
    use flate2::read::{GzDecoder, GzEncoder};
    use flate2::Compression as GzLevel;
    use std::io::Read;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct GzipCompression;

    impl Compress for GzipCompression {
        fn compress(&self, bytes: Bytes) -> anyhow::Result<Bytes> {
            let mut encoder = GzEncoder::new(&bytes[..], GzLevel::default());
            let mut out = Vec::new();
            encoder
                .read_to_end(&mut out)
                .context("gzip compression failed")?;
            Ok(Bytes::from(out))
        }
    }

    impl Decompress for GzipCompression {
        fn decompress(&self, bytes: Bytes, uncompressed_size: u32) -> anyhow::Result<Bytes> {
            let mut decoder = GzDecoder::new(&bytes[..]);
            let mut out = Vec::with_capacity(uncompressed_size as usize);
            decoder
                .read_to_end(&mut out)
                .context("gzip decompression failed")?;
            Ok(Bytes::from(out))
        }
    }
}

#[cfg(all(test, feature = "compression"))]
mod tests {
    use super::gzip::GzipCompression;
    use super::*;
    use bytes::Bytes;

    #[test]
    fn noop_round_trips() {
        let body = Bytes::from_static(b"hello world");
        let compressed = NoopCompression.compress(body.clone()).unwrap();
        let decompressed = NoopCompression
            .decompress(compressed, body.len() as u32)
            .unwrap();
        assert_eq!(decompressed, body);
    }

    #[test]
    fn gzip_round_trips() {
        let body = Bytes::from_static(b"hello world, this is a sub-entry batch");
        let compressed = GzipCompression.compress(body.clone()).unwrap();
        assert_ne!(compressed, body);
        let decompressed = GzipCompression
            .decompress(compressed, body.len() as u32)
            .unwrap();
        assert_eq!(decompressed, body);
    }
}
