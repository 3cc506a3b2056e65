//! UTF-grid interactivity overlays.
//!
//! A stored grid is a (usually zlib-compressed) JSON document `{grid, keys}`. `grid` is a
//! list of rows whose characters encode indices into `keys`; the feature record of each
//! key is stored separately and merged into `data` on read.

use crate::{MBTiles, MBTilesError, store::read_blob};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tessera_core::{Blob, TileCoord};
use tessera_derive::context;

/// A decoded UTF grid with the feature records of its referenced keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtfGrid {
	pub grid: Vec<String>,
	pub keys: Vec<String>,
	#[serde(default)]
	pub data: BTreeMap<String, Value>,
}

/// Decode one grid character to its index into `keys`.
///
/// Indices are offset by 32 and skip `"` (34) and `\` (92), so the grid stays valid
/// JSON without escaping.
pub fn decode_char(c: char) -> Option<usize> {
	let mut id = c as u32;
	if id >= 93 {
		id -= 1;
	}
	if id >= 35 {
		id -= 1;
	}
	id.checked_sub(32).map(|id| id as usize)
}

impl UtfGrid {
	/// Parse the JSON of an inflated grid blob.
	#[context("parsing UTF grid")]
	pub fn from_blob(blob: &Blob) -> Result<UtfGrid> {
		Ok(serde_json::from_slice(blob.as_slice())?)
	}

	/// The key of the cell at `column`, `row`. `None` outside the grid and for cells
	/// that reference no feature.
	pub fn key_at(&self, column: usize, row: usize) -> Option<&str> {
		let c = self.grid.get(row)?.chars().nth(column)?;
		let key = self.keys.get(decode_char(c)?)?;
		(!key.is_empty()).then_some(key.as_str())
	}

	/// All non-empty keys used by at least one cell.
	pub fn referenced_keys(&self) -> BTreeSet<&str> {
		let mut ids = BTreeSet::new();
		for row in &self.grid {
			ids.extend(row.chars().filter_map(decode_char));
		}
		ids.into_iter()
			.filter_map(|id| self.keys.get(id))
			.filter(|key| !key.is_empty())
			.map(String::as_str)
			.collect()
	}

	/// Merge stored `(key_name, key_json)` fragments into `data`.
	///
	/// Fragments of keys no cell references are dropped, and so are `NULL` fragments.
	/// Referenced keys without a fragment stay absent from `data`.
	pub fn merge_data(&mut self, fragments: Vec<(String, Option<String>)>) -> Result<()> {
		let referenced: BTreeSet<String> = self.referenced_keys().into_iter().map(String::from).collect();
		for (key, json) in fragments {
			let Some(json) = json else { continue };
			if !referenced.contains(&key) {
				continue;
			}
			let value: Value = serde_json::from_str(&json).with_context(|| format!("parsing data of key '{key}'"))?;
			self.data.insert(key, value);
		}
		Ok(())
	}
}

type GridRows = (Blob, Vec<(String, Option<String>)>);

impl MBTiles {
	/// Fetch the UTF grid at XYZ coordinate `z/x/y` with its key data merged in.
	pub async fn get_grid(&self, z: i64, x: i64, y: i64) -> Result<UtfGrid, MBTilesError> {
		log::trace!("get grid {z}/{x}/{y}");

		let Some(coord) = TileCoord::from_signed(z, x, y) else {
			return Err(MBTilesError::GridNotFound);
		};
		let Some(backend) = self.backend().await? else {
			return Err(MBTilesError::GridNotFound);
		};
		let Some((grid_sql, data_sql)) = backend.schema.grids.queries() else {
			return Err(MBTilesError::GridNotFound);
		};

		let tms = coord.to_tms();
		let (blob, fragments) = self
			.query(&backend, move |conn| -> Result<Option<GridRows>> {
				let Some(blob) = read_blob(conn, grid_sql, &tms)? else {
					return Ok(None);
				};
				log::trace!("SQL: {data_sql} {tms:?}");
				let mut stmt = conn.prepare_cached(data_sql)?;
				let fragments = stmt
					.query_map([i64::from(tms.level), i64::from(tms.x), i64::from(tms.y)], |row| {
						Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
					})?
					.collect::<Result<Vec<_>, _>>()?;
				Ok(Some((blob, fragments)))
			})
			.await
			.map_err(MBTilesError::Storage)?
			.ok_or(MBTilesError::GridNotFound)?;

		decode_grid(self, blob, fragments, &coord).map_err(MBTilesError::Decode)
	}
}

#[context("decoding grid {coord}")]
fn decode_grid(mbtiles: &MBTiles, blob: Blob, fragments: Vec<(String, Option<String>)>, coord: &TileCoord) -> Result<UtfGrid> {
	let blob = mbtiles.grid_codec().decompress(blob)?;
	let mut grid = UtfGrid::from_blob(&blob)?;
	grid.merge_data(fragments)?;
	Ok(grid)
}
