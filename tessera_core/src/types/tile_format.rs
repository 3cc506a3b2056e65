//! This module defines the [`TileFormat`] enum, the content kinds a tile payload can have,
//! and the magic-byte sniffing that infers the kind of a stored tile.
//!
//! MBTiles stores tile blobs without any per-tile type information. Callers that serve
//! tiles still need a `Content-Type`, so the format is inferred from the first bytes:
//!
//! | bytes | format |
//! |---|---|
//! | `89 50 4E 47 0D 0A 1A 0A` | PNG |
//! | `FF D8 FF` | JPG |
//! | `GIF87a` / `GIF89a` | GIF |
//! | `RIFF....WEBP` | WEBP |
//! | gzip or zlib stream | MVT (compressed) |
//! | `1A` (layer field of a vector tile) | MVT |
//! | `{` / `[` | JSON |
//!
//! # Examples
//!
//! ```rust
//! use tessera_core::{Blob, TileFormat};
//!
//! let png = Blob::from(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]);
//! assert_eq!(TileFormat::detect(&png), TileFormat::PNG);
//! assert_eq!(TileFormat::PNG.as_mime_str(), "image/png");
//! ```

use crate::{Blob, TileCompression};
use anyhow::{Result, bail};
use std::fmt::{Display, Formatter};

/// Enum representing supported tile formats.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileFormat {
	BIN,
	GIF,
	JPG,
	JSON,
	MVT,
	PNG,
	WEBP,
}

impl TileFormat {
	/// Returns a lowercase string identifier for this tile format.
	pub fn as_str(&self) -> &str {
		match self {
			TileFormat::BIN => "bin",
			TileFormat::GIF => "gif",
			TileFormat::JPG => "jpg",
			TileFormat::JSON => "json",
			TileFormat::MVT => "pbf",
			TileFormat::PNG => "png",
			TileFormat::WEBP => "webp",
		}
	}

	/// Parses the `format` value of an MBTiles metadata table.
	pub fn try_from_str(value: &str) -> Result<Self> {
		Ok(match value.to_lowercase().trim() {
			"bin" => TileFormat::BIN,
			"gif" => TileFormat::GIF,
			"jpeg" | "jpg" => TileFormat::JPG,
			"json" => TileFormat::JSON,
			"pbf" | "mvt" => TileFormat::MVT,
			"png" => TileFormat::PNG,
			"webp" => TileFormat::WEBP,
			_ => bail!("Unknown tile format: '{}'", value),
		})
	}

	/// Returns the MIME type typically associated with this tile format.
	pub fn as_mime_str(&self) -> &str {
		match self {
			TileFormat::BIN => "application/octet-stream",
			TileFormat::GIF => "image/gif",
			TileFormat::JPG => "image/jpeg",
			TileFormat::JSON => "application/json",
			TileFormat::MVT => "application/x-protobuf",
			TileFormat::PNG => "image/png",
			TileFormat::WEBP => "image/webp",
		}
	}

	/// Infer the format of a tile payload from its leading bytes.
	///
	/// Compressed payloads are assumed to be vector tiles, since raster formats carry
	/// their own compression and are never stored gzipped.
	pub fn detect(blob: &Blob) -> TileFormat {
		let head = blob.prefix(12);
		match head {
			[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, ..] => TileFormat::PNG,
			[0xff, 0xd8, 0xff, ..] => TileFormat::JPG,
			[b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => TileFormat::GIF,
			[b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P'] => TileFormat::WEBP,
			[b'{' | b'[', ..] => TileFormat::JSON,
			[0x1a, ..] => TileFormat::MVT,
			_ if TileCompression::detect(blob) != TileCompression::Uncompressed => TileFormat::MVT,
			_ => TileFormat::BIN,
		}
	}
}

impl Display for TileFormat {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
