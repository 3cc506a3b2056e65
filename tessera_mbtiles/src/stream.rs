//! Enumeration of every stored tile coordinate.
//!
//! Coordinates are read in pages with keyset pagination: each page restarts the query
//! after the last row of the previous one. A connection is only held while a page is
//! read, so a stream may be paused or dropped at any point.

use crate::{MBTiles, MBTilesError};
use anyhow::Result;
use futures::{
	Stream, StreamExt, TryStreamExt,
	stream::{self, BoxStream},
};
use std::{
	pin::Pin,
	task::{Context, Poll},
};
use tessera_core::TileCoord;

/// Storage key of a tile row: `zoom_level, tile_column, tile_row` (TMS).
type RowKey = (i64, i64, i64);

/// Precedes every stored row.
const START: RowKey = (-1, 0, 0);

/// A one-shot stream of `"z/x/y"` strings in XYZ, ascending by zoom, column and row.
pub struct ZxyStream {
	inner: BoxStream<'static, Result<TileCoord, MBTilesError>>,
}

impl ZxyStream {
	/// The coordinates themselves instead of their text form.
	pub fn into_coords(self) -> BoxStream<'static, Result<TileCoord, MBTilesError>> {
		self.inner
	}

	/// Drain the stream into one newline-separated text.
	pub async fn into_text(self) -> Result<String, MBTilesError> {
		let lines: Vec<String> = self.try_collect().await?;
		Ok(lines.join("\n"))
	}
}

impl Stream for ZxyStream {
	type Item = Result<String, MBTilesError>;

	fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		self.inner
			.poll_next_unpin(cx)
			.map(|item| item.map(|result| result.map(|coord| coord.to_string())))
	}
}

struct Cursor {
	mbtiles: MBTiles,
	after: Option<RowKey>,
}

impl MBTiles {
	/// Stream the XYZ coordinate of every stored tile.
	///
	/// The stream waits for schema detection before reading the first page. It is empty
	/// for a store that does not exist or has no tile table. A storage error is emitted
	/// once and ends the stream.
	pub fn create_zxy_stream(&self) -> ZxyStream {
		log::debug!("stream coordinates of '{}'", self.name());
		let limit = i64::from(self.config().stream_batch_size.max(1));

		let cursor = Cursor {
			mbtiles: self.clone(),
			after: Some(START),
		};

		let pages = stream::unfold(cursor, move |mut cursor| async move {
			let Some(after) = cursor.after.take() else {
				return None;
			};
			match cursor.mbtiles.read_page(after, limit).await {
				Ok(page) => {
					let last = page.last().copied();
					if page.len() as i64 == limit {
						cursor.after = last;
					}
					(!page.is_empty()).then(|| (Ok(page), cursor))
				}
				Err(err) => Some((Err(err), cursor)),
			}
		});

		let inner = pages
			.map_ok(|page| stream::iter(page.into_iter().filter_map(row_to_coord).map(Ok::<_, MBTilesError>)))
			.try_flatten()
			.boxed();

		ZxyStream { inner }
	}

	async fn read_page(&self, after: RowKey, limit: i64) -> Result<Vec<RowKey>, MBTilesError> {
		let Some(backend) = self.backend().await? else {
			return Ok(Vec::new());
		};
		let Some(source) = backend.schema.tiles.source() else {
			return Ok(Vec::new());
		};

		let sql = format!(
			"SELECT DISTINCT zoom_level, tile_column, tile_row FROM {source} \
			WHERE zoom_level > ?1 \
			OR (zoom_level = ?1 AND tile_column > ?2) \
			OR (zoom_level = ?1 AND tile_column = ?2 AND tile_row < ?3) \
			ORDER BY zoom_level, tile_column, tile_row DESC LIMIT ?4"
		);

		self.query(&backend, move |conn| {
			log::trace!("SQL: {sql} {after:?} {limit}");
			let mut stmt = conn.prepare_cached(&sql)?;
			let rows = stmt
				.query_map([after.0, after.1, after.2, limit], |row| {
					Ok((row.get(0)?, row.get(1)?, row.get(2)?))
				})?
				.collect::<Result<Vec<RowKey>, _>>()?;
			Ok(rows)
		})
		.await
		.map_err(MBTilesError::Storage)
	}
}

fn row_to_coord((z, x, row): RowKey) -> Option<TileCoord> {
	let coord = TileCoord::from_signed(z, x, row).map(|tms| tms.to_xyz());
	if coord.is_none() {
		log::warn!("skipping stored tile with invalid coordinate {z}/{x}/{row}");
	}
	coord
}
