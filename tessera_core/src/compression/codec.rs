use super::{decompress_gzip, decompress_zlib};
use crate::{Blob, TileCompression};
use anyhow::Result;
use std::fmt::Debug;

/// A decompression capability handed to tile readers.
///
/// Readers own no knowledge of how stored blobs are compressed; they call the codec they
/// were configured with. This keeps readers testable with synthetic payloads and lets a
/// caller swap the convention without touching the reader.
pub trait Codec: Debug + Send + Sync {
	/// Turn a stored blob into its plain bytes.
	///
	/// # Errors
	/// Returns an error if the blob is not valid for this codec.
	fn decompress(&self, blob: Blob) -> Result<Blob>;
}

/// Decompresses with one fixed compression. `Uncompressed` passes blobs through untouched.
impl Codec for TileCompression {
	fn decompress(&self, blob: Blob) -> Result<Blob> {
		match self {
			TileCompression::Uncompressed => Ok(blob),
			TileCompression::Gzip => decompress_gzip(&blob),
			TileCompression::Zlib => decompress_zlib(&blob),
		}
	}
}

/// Detects the compression of every blob from its header (see [`TileCompression::detect`])
/// and decompresses accordingly. Blobs without a recognised header pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectCompression;

impl Codec for DetectCompression {
	fn decompress(&self, blob: Blob) -> Result<Blob> {
		TileCompression::detect(&blob).decompress(blob)
	}
}
