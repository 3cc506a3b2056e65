//! Detection of the table layout of an MBTiles file.
//!
//! Detection runs once per handle and inspects only table and view names. The result
//! is a tagged [`SchemaInfo`] that every reader matches on; there is no per-layout type.

use anyhow::Result;
use r2d2_sqlite::rusqlite::Connection;
use std::collections::HashMap;
use tessera_derive::context;

/// Where tile rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileTables {
	/// A `tiles` table with `zoom_level, tile_column, tile_row, tile_data`.
	Flat,
	/// MBTiles 1.1: `map` rows reference deduplicated `images` through `tile_id`.
	Joined,
	/// No tile table: every tile read misses.
	None,
}

/// Where UTF grids live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridTables {
	/// `grids` and `grid_data` tables or views keyed by tile coordinate.
	Flat,
	/// `map.grid_id` → `grid_utfgrid`, `grid_key` → `keymap`.
	Joined,
	/// The store has no grids.
	None,
}

/// The layout of one MBTiles file, decided once when the handle is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaInfo {
	pub tiles: TileTables,
	pub grids: GridTables,
	pub has_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectKind {
	Table,
	View,
}

impl SchemaInfo {
	/// The layout of a store that has no tables at all.
	pub fn empty() -> SchemaInfo {
		SchemaInfo {
			tiles: TileTables::None,
			grids: GridTables::None,
			has_metadata: false,
		}
	}

	pub fn has_tiles(&self) -> bool {
		self.tiles != TileTables::None
	}

	pub fn has_grids(&self) -> bool {
		self.grids != GridTables::None
	}

	/// Inspect `sqlite_master` and decide the layout.
	///
	/// # Errors
	/// Fails if the file is not a readable SQLite database.
	#[context("detecting MBTiles schema")]
	pub(crate) fn detect(conn: &Connection) -> Result<SchemaInfo> {
		let mut stmt = conn.prepare("SELECT name, type FROM sqlite_master WHERE type IN ('table', 'view')")?;
		let mut objects = HashMap::new();
		let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
		for row in rows {
			let (name, kind) = row?;
			let kind = if kind == "view" { ObjectKind::View } else { ObjectKind::Table };
			objects.insert(name.to_lowercase(), kind);
		}
		log::trace!("schema objects: {objects:?}");

		let schema = SchemaInfo::from_objects(&objects);
		log::debug!("detected schema {schema:?}");
		Ok(schema)
	}

	fn from_objects(objects: &HashMap<String, ObjectKind>) -> SchemaInfo {
		let has = |name: &str| objects.contains_key(name);
		let joined = has("map") && has("images");

		let tiles = match objects.get("tiles") {
			Some(ObjectKind::Table) => {
				if joined {
					log::warn!("store has a 'tiles' table and 'map'/'images' tables, reading tiles from 'tiles'");
				}
				TileTables::Flat
			}
			// a `tiles` view over `map`/`images` is read through the joined tables
			Some(ObjectKind::View) if !joined => TileTables::Flat,
			_ if joined => TileTables::Joined,
			_ => TileTables::None,
		};

		let grids = if has("grids") && has("grid_data") {
			GridTables::Flat
		} else if has("map") && has("grid_utfgrid") && has("grid_key") && has("keymap") {
			GridTables::Joined
		} else {
			GridTables::None
		};

		SchemaInfo {
			tiles,
			grids,
			has_metadata: has("metadata"),
		}
	}
}

impl TileTables {
	/// The `FROM` clause selecting `zoom_level, tile_column, tile_row, tile_data` rows.
	pub(crate) fn source(&self) -> Option<&'static str> {
		match self {
			TileTables::Flat => Some("tiles"),
			TileTables::Joined => Some("map JOIN images USING (tile_id)"),
			TileTables::None => None,
		}
	}
}

impl GridTables {
	/// Queries for the grid blob and the key data of one TMS coordinate, both bound to
	/// `?1 = zoom_level, ?2 = tile_column, ?3 = tile_row`.
	pub(crate) fn queries(&self) -> Option<(&'static str, &'static str)> {
		match self {
			GridTables::Flat => Some((
				"SELECT grid FROM grids WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
				"SELECT key_name, key_json FROM grid_data WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
			)),
			GridTables::Joined => Some((
				"SELECT grid_utfgrid.grid_utfgrid FROM map \
				JOIN grid_utfgrid ON grid_utfgrid.grid_id = map.grid_id \
				WHERE map.zoom_level = ?1 AND map.tile_column = ?2 AND map.tile_row = ?3",
				"SELECT keymap.key_name, keymap.key_json FROM map \
				JOIN grid_key ON grid_key.grid_id = map.grid_id \
				JOIN keymap ON keymap.key_name = grid_key.key_name \
				WHERE map.zoom_level = ?1 AND map.tile_column = ?2 AND map.tile_row = ?3",
			)),
			GridTables::None => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn detect(sql: &str) -> SchemaInfo {
		let conn = Connection::open_in_memory().unwrap();
		conn.execute_batch(sql).unwrap();
		SchemaInfo::detect(&conn).unwrap()
	}

	const MAP: &str = "CREATE TABLE map (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_id TEXT, grid_id TEXT);";
	const IMAGES: &str = "CREATE TABLE images (tile_data BLOB, tile_id TEXT);";
	const TILES: &str = "CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);";
	const TILES_VIEW: &str = "CREATE VIEW tiles AS SELECT zoom_level, tile_column, tile_row, tile_data FROM map JOIN images USING (tile_id);";

	#[rstest]
	#[case(TILES, TileTables::Flat)]
	#[case(&format!("{MAP}{IMAGES}"), TileTables::Joined)]
	#[case(&format!("{MAP}{IMAGES}{TILES_VIEW}"), TileTables::Joined)]
	#[case(&format!("{MAP}{IMAGES}{TILES}"), TileTables::Flat)]
	#[case(MAP, TileTables::None)]
	#[case(IMAGES, TileTables::None)]
	#[case("CREATE TABLE metadata (name TEXT, value TEXT);", TileTables::None)]
	#[case("", TileTables::None)]
	fn tile_tables(#[case] sql: &str, #[case] expected: TileTables) {
		assert_eq!(detect(sql).tiles, expected);
	}

	#[test]
	fn tiles_view_without_joined_tables_is_flat() {
		let schema = detect(
			"CREATE TABLE raw (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);
			CREATE VIEW tiles AS SELECT * FROM raw;",
		);
		assert_eq!(schema.tiles, TileTables::Flat);
	}

	#[test]
	fn table_names_are_case_insensitive() {
		let schema = detect("CREATE TABLE Tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB); CREATE TABLE METADATA (name TEXT, value TEXT);");
		assert_eq!(schema.tiles, TileTables::Flat);
		assert!(schema.has_metadata);
	}

	#[test]
	fn grid_tables() {
		let flat = detect(&format!(
			"{TILES} CREATE TABLE grids (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, grid BLOB);
			CREATE TABLE grid_data (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, key_name TEXT, key_json TEXT);"
		));
		assert_eq!(flat.grids, GridTables::Flat);
		assert!(flat.has_grids());

		let joined = detect(&format!(
			"{MAP}{IMAGES} CREATE TABLE grid_utfgrid (grid_id TEXT, grid_utfgrid BLOB);
			CREATE TABLE grid_key (grid_id TEXT, key_name TEXT);
			CREATE TABLE keymap (key_name TEXT, key_json TEXT);"
		));
		assert_eq!(joined.grids, GridTables::Joined);

		let partial = detect(&format!("{MAP}{IMAGES} CREATE TABLE grid_utfgrid (grid_id TEXT, grid_utfgrid BLOB);"));
		assert_eq!(partial.grids, GridTables::None);
		assert!(!partial.has_grids());
	}

	#[test]
	fn empty_schema() {
		let schema = SchemaInfo::empty();
		assert!(!schema.has_tiles());
		assert!(!schema.has_grids());
		assert!(!schema.has_metadata);
		assert_eq!(detect(""), schema);
	}

	#[test]
	fn garbage_file_fails_detection() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corrupt.mbtiles");
		std::fs::write(&path, vec![0x42u8; 4096]).unwrap();
		let conn = Connection::open(&path).unwrap();
		let err = SchemaInfo::detect(&conn).unwrap_err();
		assert_eq!(err.to_string(), "detecting MBTiles schema");
	}
}
