use crate::{MBTiles, MBTilesError};
use anyhow::Result;
use r2d2_sqlite::rusqlite::{Connection, OptionalExtension, types::ValueRef};
use std::collections::BTreeMap;

impl MBTiles {
	/// Read the metadata value stored under `name`.
	///
	/// A row holding SQL `NULL` yields `Ok(None)`. Numbers and blobs stored by sloppy
	/// writers are handed out as text.
	pub async fn get_metadata(&self, name: &str) -> Result<Option<String>, MBTilesError> {
		log::trace!("get metadata '{name}'");

		let not_found = || MBTilesError::KeyNotFound(name.to_string());
		let Some(backend) = self.backend().await? else {
			return Err(not_found());
		};
		if !backend.schema.has_metadata {
			return Err(not_found());
		}

		let key = name.to_string();
		self.query(&backend, move |conn| read_value(conn, &key))
			.await
			.map_err(MBTilesError::Storage)?
			.ok_or_else(not_found)
	}

	/// All metadata rows, `NULL` values skipped. Empty for a store without metadata.
	pub(crate) async fn read_all_metadata(&self) -> Result<BTreeMap<String, String>, MBTilesError> {
		let Some(backend) = self.backend().await? else {
			return Ok(BTreeMap::new());
		};
		if !backend.schema.has_metadata {
			return Ok(BTreeMap::new());
		}

		self.query(&backend, |conn| {
			let mut stmt = conn.prepare("SELECT name, value FROM metadata")?;
			let mut rows = stmt.query([])?;
			let mut map = BTreeMap::new();
			while let Some(row) = rows.next()? {
				let name: String = row.get(0)?;
				if let Some(value) = value_to_string(row.get_ref(1)?) {
					map.insert(name, value);
				}
			}
			Ok(map)
		})
		.await
		.map_err(MBTilesError::Storage)
	}
}

/// `None` if there is no row, `Some(None)` if the row holds `NULL`.
fn read_value(conn: &Connection, name: &str) -> Result<Option<Option<String>>> {
	log::trace!("SQL: SELECT value FROM metadata WHERE name = '{name}'");
	let mut stmt = conn.prepare_cached("SELECT value FROM metadata WHERE name = ?1")?;
	let value = stmt.query_row([name], |row| Ok(value_to_string(row.get_ref(0)?))).optional()?;
	Ok(value)
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
	match value {
		ValueRef::Null => None,
		ValueRef::Integer(i) => Some(i.to_string()),
		ValueRef::Real(f) => Some(f.to_string()),
		ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
	}
}
