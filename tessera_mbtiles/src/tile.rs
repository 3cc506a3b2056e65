use tessera_core::{Blob, TileCompression, TileFormat};

/// A tile payload as read from the store, with the content kind inferred from its bytes.
///
/// The bytes are exactly what the tile codec produced, by default exactly what is
/// stored. `format` and `compression` only feed `Content-Type` and `Content-Encoding`
/// headers of whoever serves the tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
	blob: Blob,
	format: TileFormat,
	compression: TileCompression,
}

impl Tile {
	pub fn new(blob: Blob) -> Tile {
		let format = TileFormat::detect(&blob);
		let compression = TileCompression::detect(&blob);
		Tile {
			blob,
			format,
			compression,
		}
	}

	pub fn format(&self) -> TileFormat {
		self.format
	}

	pub fn compression(&self) -> TileCompression {
		self.compression
	}

	pub fn content_type(&self) -> &str {
		self.format.as_mime_str()
	}

	pub fn content_encoding(&self) -> Option<&'static str> {
		self.compression.content_encoding()
	}

	pub fn as_blob(&self) -> &Blob {
		&self.blob
	}

	pub fn into_blob(self) -> Blob {
		self.blob
	}

	pub fn len(&self) -> usize {
		self.blob.len()
	}

	pub fn is_empty(&self) -> bool {
		self.blob.is_empty()
	}
}
