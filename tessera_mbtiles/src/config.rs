use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
	sync::Arc,
	time::Duration,
};
use tessera_core::{Codec, DetectCompression, TileCompression};

/// Settings for opening an MBTiles store.
///
/// Every field has a default, so an empty YAML document is a valid configuration:
///
/// ```yaml
/// allow_missing: true
/// pool_size: 1
/// connection_timeout_ms: 5000
/// stream_batch_size: 1000
/// tile_compression: none
/// grid_compression: zlib   # leave unset to detect per blob
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MBTilesConfig {
	/// Open a path that does not exist as an empty store instead of failing.
	pub allow_missing: bool,

	/// Number of SQLite connections per handle. Reads are serialized on a single
	/// connection unless this is raised.
	pub pool_size: u32,

	/// How long to wait for a free connection before a read fails.
	pub connection_timeout_ms: u64,

	/// Rows fetched per page while streaming coordinates.
	pub stream_batch_size: u32,

	/// Compression of stored tile payloads. `none` hands payloads out exactly as stored.
	pub tile_compression: TileCompression,

	/// Compression of stored UTF grids. Unset detects gzip or zlib from each blob.
	pub grid_compression: Option<TileCompression>,
}

impl Default for MBTilesConfig {
	fn default() -> Self {
		Self {
			allow_missing: true,
			pool_size: 1,
			connection_timeout_ms: 5000,
			stream_batch_size: 1000,
			tile_compression: TileCompression::Uncompressed,
			grid_compression: None,
		}
	}
}

impl MBTilesConfig {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("opening config {path:?}"))?;
		MBTilesConfig::from_reader(BufReader::new(file)).with_context(|| format!("parsing config {path:?}"))
	}

	pub fn connection_timeout(&self) -> Duration {
		Duration::from_millis(self.connection_timeout_ms.max(1))
	}

	/// The codec applied to tile payloads.
	pub fn tile_codec(&self) -> Arc<dyn Codec> {
		Arc::new(self.tile_compression)
	}

	/// The codec applied to grid blobs.
	pub fn grid_codec(&self) -> Arc<dyn Codec> {
		match self.grid_compression {
			Some(compression) => Arc::new(compression),
			None => Arc::new(DetectCompression),
		}
	}
}
