//! A summary of a tile set: its metadata rows completed with values derived from the
//! tile table where the metadata leaves them out.

use crate::{MBTiles, MBTilesError, store::Backend};
use anyhow::{Result, anyhow};
use r2d2_sqlite::rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tessera_core::{MAX_LEVEL, TileCoord};
use tessera_derive::context;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MBTilesInfo {
	/// File name without extension.
	pub id: String,
	pub basename: String,
	pub filesize: u64,
	/// Row order of the storage, always `"tms"`.
	pub scheme: String,
	pub minzoom: Option<u8>,
	pub maxzoom: Option<u8>,
	/// `[west, south, east, north]` in degrees.
	pub bounds: Option<[f64; 4]>,
	/// `[longitude, latitude, zoom]`.
	pub center: Option<[f64; 3]>,
	/// The parsed `json` metadata row, if any.
	pub json: Option<Value>,
	/// Every other metadata row.
	#[serde(flatten)]
	pub properties: BTreeMap<String, String>,
}

impl MBTiles {
	/// Collect metadata and fill in zoom range, bounds and center from the tiles.
	///
	/// A store that does not exist yields an info without any derived values.
	pub async fn get_info(&self) -> Result<MBTilesInfo, MBTilesError> {
		let mut properties = self.read_all_metadata().await?;
		let path = self.path();

		let mut info = MBTilesInfo {
			id: path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
			basename: path.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default(),
			filesize: std::fs::metadata(path).map_or(0, |m| m.len()),
			scheme: String::from("tms"),
			minzoom: take_parsed(&mut properties, "minzoom"),
			maxzoom: take_parsed(&mut properties, "maxzoom"),
			bounds: take_list(&mut properties, "bounds"),
			center: take_list(&mut properties, "center"),
			json: None,
			properties,
		};

		if let Some(json) = info.properties.remove("json") {
			match serde_json::from_str(&json) {
				Ok(value) => info.json = Some(value),
				Err(err) => log::warn!("metadata 'json' of '{}' is not valid JSON: {err}", self.name()),
			}
		}

		if let Some(backend) = self.backend().await?
			&& backend.schema.has_tiles()
		{
			self.derive_from_tiles(&backend, &mut info).await.map_err(MBTilesError::Storage)?;
		}

		if info.center.is_none()
			&& let (Some([west, south, east, north]), Some(min), Some(max)) = (info.bounds, info.minzoom, info.maxzoom)
		{
			let range = max.saturating_sub(min);
			let zoom = if range <= 1 { max } else { range / 2 + min };
			info.center = Some([(west + east) / 2.0, (south + north) / 2.0, f64::from(zoom)]);
		}

		Ok(info)
	}

	async fn derive_from_tiles(&self, backend: &Backend, info: &mut MBTilesInfo) -> Result<()> {
		let Some(source) = backend.schema.tiles.source() else {
			return Ok(());
		};

		if info.minzoom.is_none() || info.maxzoom.is_none() {
			let (min, max) = self
				.query(backend, move |conn| {
					Ok((
						simple_query(conn, "MIN(zoom_level)", source, "")?,
						simple_query(conn, "MAX(zoom_level)", source, "")?,
					))
				})
				.await?;
			info.minzoom = info.minzoom.or(min.and_then(valid_level));
			info.maxzoom = info.maxzoom.or(max.and_then(valid_level));
		}

		if info.bounds.is_none()
			&& let Some(level) = info.maxzoom
		{
			info.bounds = self.query(backend, move |conn| tile_bounds(conn, source, level)).await?;
		}
		Ok(())
	}
}

fn valid_level(level: i64) -> Option<u8> {
	let valid = u8::try_from(level).ok().filter(|level| *level <= MAX_LEVEL);
	if valid.is_none() {
		log::warn!("ignoring stored zoom level {level}");
	}
	valid
}

/// Geographic bounds of all tiles stored at `level`.
#[context("deriving bounds at level {level}")]
fn tile_bounds(conn: &Connection, source: &str, level: u8) -> Result<Option<[f64; 4]>> {
	if level > MAX_LEVEL {
		log::warn!("cannot derive bounds at level {level}, the highest level is {MAX_LEVEL}");
		return Ok(None);
	}

	let filter = format!("WHERE zoom_level = {level}");
	let extent = [
		simple_query(conn, "MIN(tile_column)", source, &filter)?,
		simple_query(conn, "MAX(tile_column)", source, &filter)?,
		simple_query(conn, "MIN(tile_row)", source, &filter)?,
		simple_query(conn, "MAX(tile_row)", source, &filter)?,
	];
	let [Some(x_min), Some(x_max), Some(row_min), Some(row_max)] = extent else {
		return Ok(None);
	};

	let max = (1i64 << level) - 1;
	let in_range = |v: i64| -> Result<u32> {
		u32::try_from(v)
			.ok()
			.filter(|v| i64::from(*v) <= max)
			.ok_or_else(|| anyhow!("tile index {v} is out of range"))
	};
	// the highest TMS row is the northernmost XYZ row; at MAX_LEVEL `max + 1` still fits in u32
	let (x_min, x_max) = (in_range(x_min)?, in_range(x_max)?);
	let (y_min, y_max) = (in_range(max - row_max)?, in_range(max - row_min)?);

	let [west, north] = TileCoord::coord_to_geo(level, x_min, y_min);
	let [east, south] = TileCoord::coord_to_geo(level, x_max + 1, y_max + 1);
	Ok(Some([west, south, east, north]))
}

fn simple_query(conn: &Connection, value: &str, source: &str, filter: &str) -> Result<Option<i64>> {
	let sql = format!("SELECT {value} FROM {source} {filter}");
	log::trace!("SQL: {sql}");
	Ok(conn.query_row(&sql, [], |row| row.get::<_, Option<i64>>(0))?)
}

fn take_parsed(properties: &mut BTreeMap<String, String>, key: &str) -> Option<u8> {
	let value = properties.remove(key)?;
	let parsed = value.trim().parse().ok();
	if parsed.is_none() {
		log::warn!("ignoring metadata {key} '{value}'");
	}
	parsed
}

fn take_list<const N: usize>(properties: &mut BTreeMap<String, String>, key: &str) -> Option<[f64; N]> {
	let value = properties.remove(key)?;
	let numbers: Vec<f64> = value.split(',').filter_map(|v| v.trim().parse().ok()).collect();
	let parsed = <[f64; N]>::try_from(numbers).ok();
	if parsed.is_none() {
		log::warn!("ignoring metadata {key} '{value}'");
	}
	parsed
}
