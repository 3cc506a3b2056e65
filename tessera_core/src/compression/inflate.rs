use crate::Blob;
use anyhow::{Context, Result};
use flate2::bufread::{GzDecoder, GzEncoder, ZlibDecoder, ZlibEncoder};
use std::io::Read;
use tessera_derive::context;

/// Decompresses a gzip stream.
///
/// # Errors
///
/// * If the data is not a valid gzip stream.
#[context("Decompressing data using Gzip")]
pub fn decompress_gzip(blob: &Blob) -> Result<Blob> {
	let mut decoder = GzDecoder::new(blob.as_slice());
	let mut decompressed_data = Vec::new();
	decoder
		.read_to_end(&mut decompressed_data)
		.context("Failed to decompress data using Gzip")?;
	Ok(Blob::from(decompressed_data))
}

/// Decompresses a zlib stream, the format UTF grids are conventionally stored in.
///
/// # Errors
///
/// * If the data is not a valid zlib stream.
#[context("Decompressing data using Zlib")]
pub fn decompress_zlib(blob: &Blob) -> Result<Blob> {
	let mut decoder = ZlibDecoder::new(blob.as_slice());
	let mut decompressed_data = Vec::new();
	decoder
		.read_to_end(&mut decompressed_data)
		.context("Failed to decompress data using Zlib")?;
	Ok(Blob::from(decompressed_data))
}

/// Compresses data using gzip. Tile stores are only read, so this exists for building
/// fixtures and for callers that recompress.
#[context("Compressing blob with algorithm: Gzip")]
pub fn compress_gzip(blob: &Blob) -> Result<Blob> {
	let mut encoder = GzEncoder::new(blob.as_slice(), flate2::Compression::best());
	let mut compressed_data = Vec::new();
	encoder
		.read_to_end(&mut compressed_data)
		.context("Failed to compress data using Gzip")?;
	Ok(Blob::from(compressed_data))
}

/// Compresses data using zlib.
#[context("Compressing blob with algorithm: Zlib")]
pub fn compress_zlib(blob: &Blob) -> Result<Blob> {
	let mut encoder = ZlibEncoder::new(blob.as_slice(), flate2::Compression::default());
	let mut compressed_data = Vec::new();
	encoder
		.read_to_end(&mut compressed_data)
		.context("Failed to compress data using Zlib")?;
	Ok(Blob::from(compressed_data))
}
