//! This module defines the [`TileCompression`] enum: the transport compressions found
//! around tile payloads and UTF-grid blobs in tile stores.
//!
//! # Examples
//!
//! ```
//! use tessera_core::{Blob, TileCompression};
//!
//! assert_eq!(TileCompression::parse_str("gz").unwrap(), TileCompression::Gzip);
//! assert_eq!(TileCompression::detect(&Blob::from(&[0x1f, 0x8b, 8, 0])), TileCompression::Gzip);
//! assert_eq!(TileCompression::detect(&Blob::from("{}")), TileCompression::Uncompressed);
//! ```

use crate::Blob;
use anyhow::{Result, bail};
use serde::Deserialize;
use std::fmt::Display;

/// Enum representing possible compression algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileCompression {
	#[default]
	#[serde(alias = "none", alias = "raw")]
	Uncompressed,
	#[serde(alias = "gz")]
	Gzip,
	#[serde(alias = "deflate")]
	Zlib,
}

impl TileCompression {
	pub fn as_str(&self) -> &str {
		match self {
			TileCompression::Uncompressed => "none",
			TileCompression::Gzip => "gzip",
			TileCompression::Zlib => "zlib",
		}
	}

	/// The value of an HTTP `Content-Encoding` header for this compression, if any.
	pub fn content_encoding(&self) -> Option<&'static str> {
		match self {
			TileCompression::Uncompressed => None,
			TileCompression::Gzip => Some("gzip"),
			TileCompression::Zlib => Some("deflate"),
		}
	}

	pub fn parse_str(value: &str) -> Result<Self> {
		Ok(match value.to_lowercase().trim() {
			"gz" | "gzip" => TileCompression::Gzip,
			"zlib" | "deflate" => TileCompression::Zlib,
			"none" | "raw" | "uncompressed" => TileCompression::Uncompressed,
			_ => bail!("Unknown tile compression '{value}'. Expected gzip, zlib or none"),
		})
	}

	/// Guess the compression of `blob` from its first bytes.
	///
	/// Gzip is recognised by its magic number `1f 8b`. Zlib has no magic number, so a
	/// stream header is accepted when the method is deflate (`0x?8`), the window size is
	/// valid and the header checksum `(CMF * 256 + FLG) % 31 == 0` holds.
	pub fn detect(blob: &Blob) -> TileCompression {
		match blob.prefix(2) {
			[0x1f, 0x8b] => TileCompression::Gzip,
			[cmf, flg] if cmf & 0x0f == 8 && cmf >> 4 <= 7 && (u16::from(*cmf) * 256 + u16::from(*flg)) % 31 == 0 => {
				TileCompression::Zlib
			}
			_ => TileCompression::Uncompressed,
		}
	}
}

impl Display for TileCompression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("none", TileCompression::Uncompressed)]
	#[case("raw", TileCompression::Uncompressed)]
	#[case("gzip", TileCompression::Gzip)]
	#[case(" GZ ", TileCompression::Gzip)]
	#[case("zlib", TileCompression::Zlib)]
	#[case("deflate", TileCompression::Zlib)]
	fn parse_str_accepts_aliases(#[case] input: &str, #[case] expected: TileCompression) {
		assert_eq!(TileCompression::parse_str(input).unwrap(), expected);
	}

	#[test]
	fn parse_str_rejects_unknown() {
		assert!(TileCompression::parse_str("brotli").is_err());
		assert!(TileCompression::parse_str("").is_err());
	}

	#[rstest]
	#[case(&[0x1f, 0x8b, 0x08], TileCompression::Gzip)]
	#[case(&[0x78, 0x9c, 0x00], TileCompression::Zlib)]
	#[case(&[0x78, 0x01, 0x00], TileCompression::Zlib)]
	#[case(&[0x78, 0xda, 0x00], TileCompression::Zlib)]
	#[case(&[0x78, 0x9d, 0x00], TileCompression::Uncompressed)]
	#[case(b"{\"grid\"", TileCompression::Uncompressed)]
	#[case(&[0x89, 0x50, 0x4e], TileCompression::Uncompressed)]
	#[case(&[0x1f], TileCompression::Uncompressed)]
	#[case(&[], TileCompression::Uncompressed)]
	fn detect_from_header(#[case] bytes: &[u8], #[case] expected: TileCompression) {
		assert_eq!(TileCompression::detect(&Blob::from(bytes)), expected);
	}

	#[test]
	fn display_and_encoding() {
		assert_eq!(TileCompression::Gzip.to_string(), "gzip");
		assert_eq!(TileCompression::Uncompressed.to_string(), "none");
		assert_eq!(TileCompression::Gzip.content_encoding(), Some("gzip"));
		assert_eq!(TileCompression::Zlib.content_encoding(), Some("deflate"));
		assert_eq!(TileCompression::Uncompressed.content_encoding(), None);
	}
}
