use thiserror::Error;

/// Outcome of a failed read.
///
/// The three `*NotFound` variants are expected misses: the address holds nothing. They
/// are never caused by a broken store. `Decode` and `Storage` report data that exists but
/// could not be read.
#[derive(Debug, Error)]
pub enum MBTilesError {
	/// The coordinate is out of range, or no tile is stored there.
	#[error("Tile does not exist")]
	TileNotFound,

	/// The coordinate is out of range, no grid is stored there, or the store has no grids.
	#[error("Grid does not exist")]
	GridNotFound,

	/// The metadata table has no row with this name.
	#[error("Key does not exist: '{0}'")]
	KeyNotFound(String),

	/// The backing file exists but could not be opened or inspected.
	/// Reported to every caller of the handle; detection is never retried.
	#[error("MBTiles store is unavailable: {0}")]
	StoreUnavailable(String),

	/// A stored tile, grid or metadata value could not be decompressed or parsed.
	#[error("stored data could not be decoded: {0:#}")]
	Decode(anyhow::Error),

	/// A query failed on a store that was readable at open.
	#[error("MBTiles query failed: {0:#}")]
	Storage(anyhow::Error),
}

impl MBTilesError {
	/// `true` for tile, grid and key misses.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			MBTilesError::TileNotFound | MBTilesError::GridNotFound | MBTilesError::KeyNotFound(_)
		)
	}
}
