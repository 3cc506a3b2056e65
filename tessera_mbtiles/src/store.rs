//! The MBTiles store handle.
//!
//! [`MBTiles::open`] returns immediately and starts schema detection in a background
//! task. That task runs detection exactly once and is the only writer of the detected
//! state. Reads issued while it runs queue on a fair lock the task holds until it has
//! published the result; they then reach storage one after another in the order they
//! were issued. The detected state never changes afterwards:
//!
//! - the file does not exist: an empty store, every read misses,
//! - the file could not be inspected: every read fails with `StoreUnavailable`,
//! - otherwise: a connection pool plus the detected [`SchemaInfo`].
//!
//! SQLite calls are blocking, so each one runs on tokio's blocking thread pool and the
//! async caller is suspended meanwhile. The pool holds a single connection by default,
//! which serializes storage calls of one handle.

use crate::{MBTilesConfig, MBTilesError, SchemaInfo, Tile};
use anyhow::{Result, bail};
use r2d2::Pool;
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{Connection, OpenFlags, OptionalExtension, types::ValueRef},
};
use std::{
	fmt::Debug,
	ops::Deref,
	path::{Path, PathBuf},
	sync::Arc,
};
use tessera_core::{Blob, Codec, TileCoord};
use tessera_derive::context;
use tokio::{
	runtime::Handle,
	sync::{Mutex, MutexGuard, OnceCell},
};

/// A read handle on one MBTiles file.
///
/// Cloning is cheap; clones share the connection and the detected schema.
#[derive(Clone)]
pub struct MBTiles {
	inner: Arc<Inner>,
}

struct Inner {
	name: String,
	path: PathBuf,
	config: MBTilesConfig,
	tile_codec: Arc<dyn Codec>,
	grid_codec: Arc<dyn Codec>,
	/// Written once, by the detection task.
	state: OnceCell<StoreState>,
	/// Held by the detection task until `state` is set; reads arriving earlier wait here.
	queue: Arc<Mutex<()>>,
}

enum StoreState {
	Missing,
	Unavailable(String),
	Open(Backend),
}

pub(crate) struct Backend {
	pool: Pool<SqliteConnectionManager>,
	pub(crate) schema: SchemaInfo,
}

/// The open backend as seen by one read.
///
/// A read that had to wait for detection keeps its place in the queue until this is
/// dropped, so queued reads reach storage in issue order.
pub(crate) struct Ready<'a> {
	backend: &'a Backend,
	_turn: Option<MutexGuard<'a, ()>>,
}

impl Deref for Ready<'_> {
	type Target = Backend;

	fn deref(&self) -> &Backend {
		self.backend
	}
}

impl MBTiles {
	/// Open an MBTiles file with the default [`MBTilesConfig`].
	pub async fn open(path: impl AsRef<Path>) -> Result<MBTiles, MBTilesError> {
		MBTiles::open_with_config(path, MBTilesConfig::default()).await
	}

	/// Open an MBTiles file; codecs are taken from `config`.
	pub async fn open_with_config(path: impl AsRef<Path>, config: MBTilesConfig) -> Result<MBTiles, MBTilesError> {
		let tile_codec = config.tile_codec();
		let grid_codec = config.grid_codec();
		MBTiles::open_with_codecs(path, config, tile_codec, grid_codec).await
	}

	/// Open an MBTiles file with caller-provided codecs for tile payloads and grid blobs.
	///
	/// Must be called from within a tokio runtime, which runs schema detection and all
	/// storage calls of the handle.
	///
	/// # Errors
	/// Fails with [`MBTilesError::StoreUnavailable`] if there is no tokio runtime, or if
	/// the file is missing and `config.allow_missing` is `false`. Problems with the file
	/// itself surface on the first read.
	pub async fn open_with_codecs(
		path: impl AsRef<Path>,
		config: MBTilesConfig,
		tile_codec: Arc<dyn Codec>,
		grid_codec: Arc<dyn Codec>,
	) -> Result<MBTiles, MBTilesError> {
		let path = path.as_ref().to_path_buf();
		log::debug!("open {path:?}");

		if !config.allow_missing && !path.exists() {
			return Err(MBTilesError::StoreUnavailable(format!("file {path:?} does not exist")));
		}

		let runtime = Handle::try_current()
			.map_err(|err| MBTilesError::StoreUnavailable(format!("opening {path:?} needs a tokio runtime: {err}")))?;

		let queue = Arc::new(Mutex::new(()));
		let detecting = Arc::clone(&queue).try_lock_owned().ok();

		let inner = Arc::new(Inner {
			name: path.to_string_lossy().into_owned(),
			path,
			config,
			tile_codec,
			grid_codec,
			state: OnceCell::new(),
			queue,
		});

		let task = Arc::clone(&inner);
		runtime.spawn(async move {
			let state = task.detect().await;
			let _ = task.state.set(state);
			drop(detecting);
		});

		Ok(MBTiles { inner })
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn path(&self) -> &Path {
		&self.inner.path
	}

	pub fn config(&self) -> &MBTilesConfig {
		&self.inner.config
	}

	pub(crate) fn grid_codec(&self) -> &dyn Codec {
		self.inner.grid_codec.as_ref()
	}

	/// The table layout this handle reads from. Waits for detection.
	pub async fn schema(&self) -> Result<SchemaInfo, MBTilesError> {
		Ok(match self.backend().await? {
			Some(backend) => backend.schema,
			None => SchemaInfo::empty(),
		})
	}

	/// Fetch the tile at XYZ coordinate `z/x/y`.
	///
	/// Out of range coordinates miss without touching storage. The stored row is looked
	/// up at the TMS row `2^z - 1 - y`.
	pub async fn get_tile(&self, z: i64, x: i64, y: i64) -> Result<Tile, MBTilesError> {
		log::trace!("get tile {z}/{x}/{y}");

		let Some(coord) = TileCoord::from_signed(z, x, y) else {
			return Err(MBTilesError::TileNotFound);
		};
		let Some(backend) = self.backend().await? else {
			return Err(MBTilesError::TileNotFound);
		};
		let Some(source) = backend.schema.tiles.source() else {
			return Err(MBTilesError::TileNotFound);
		};

		let sql = format!("SELECT tile_data FROM {source} WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3");
		let tms = coord.to_tms();
		let blob = self
			.query(&backend, move |conn| read_blob(conn, &sql, &tms))
			.await
			.map_err(MBTilesError::Storage)?
			.ok_or(MBTilesError::TileNotFound)?;

		let blob = self.inner.tile_codec.decompress(blob).map_err(MBTilesError::Decode)?;
		Ok(Tile::new(blob))
	}

	/// Wait for schema detection and return the open backend, `None` for a missing file.
	pub(crate) async fn backend(&self) -> Result<Option<Ready<'_>>, MBTilesError> {
		let (state, turn) = match self.inner.state.get() {
			Some(state) => (state, None),
			None => {
				let turn = self.inner.queue.lock().await;
				// the detection task releases the queue without a state only if it was aborted
				let state = self.inner.state.get().ok_or_else(|| {
					MBTilesError::StoreUnavailable(format!("schema detection of '{}' did not finish", self.inner.name))
				})?;
				(state, Some(turn))
			}
		};

		match state {
			StoreState::Open(backend) => Ok(Some(Ready { backend, _turn: turn })),
			StoreState::Missing => Ok(None),
			StoreState::Unavailable(reason) => Err(MBTilesError::StoreUnavailable(reason.clone())),
		}
	}

	/// Run a query on a pooled connection without blocking the async runtime.
	pub(crate) async fn query<T, F>(&self, backend: &Backend, query: F) -> Result<T>
	where
		F: FnOnce(&Connection) -> Result<T> + Send + 'static,
		T: Send + 'static,
	{
		let pool = backend.pool.clone();
		tokio::task::spawn_blocking(move || {
			let conn = pool.get()?;
			query(&conn)
		})
		.await?
	}
}

impl Inner {
	async fn detect(&self) -> StoreState {
		log::debug!("detecting schema of '{}'", self.name);
		if !self.path.exists() {
			log::debug!("{:?} does not exist, reading it as an empty store", self.path);
			return StoreState::Missing;
		}

		let path = self.path.clone();
		let config = self.config.clone();
		match tokio::task::spawn_blocking(move || Backend::connect(&path, &config)).await {
			Ok(Ok(backend)) => StoreState::Open(backend),
			Ok(Err(err)) => {
				log::warn!("MBTiles '{}' is unavailable: {err:#}", self.name);
				StoreState::Unavailable(format!("{err:#}"))
			}
			Err(err) => {
				log::warn!("schema detection of '{}' did not finish: {err}", self.name);
				StoreState::Unavailable(err.to_string())
			}
		}
	}
}

impl Backend {
	#[context("opening MBTiles '{}'", path.display())]
	fn connect(path: &Path, config: &MBTilesConfig) -> Result<Backend> {
		let manager = SqliteConnectionManager::file(path)
			.with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI);
		let pool = Pool::builder()
			.max_size(config.pool_size.max(1))
			.connection_timeout(config.connection_timeout())
			.build(manager)?;

		let schema = SchemaInfo::detect(&*pool.get()?)?;
		Ok(Backend { pool, schema })
	}
}

/// Read the single payload a coordinate query returns.
///
/// `BLOB` and `TEXT` values are both taken as bytes. No row or a `NULL` value is `None`.
pub(crate) fn read_blob(conn: &Connection, sql: &str, coord: &TileCoord) -> Result<Option<Blob>> {
	log::trace!("SQL: {sql} {coord:?}");
	let mut stmt = conn.prepare_cached(sql)?;
	let value = stmt
		.query_row([i64::from(coord.level), i64::from(coord.x), i64::from(coord.y)], |row| {
			Ok(match row.get_ref(0)? {
				ValueRef::Blob(bytes) | ValueRef::Text(bytes) => Some(Ok(bytes.to_vec())),
				ValueRef::Null => None,
				other => Some(Err(other.data_type())),
			})
		})
		.optional()?
		.flatten();

	match value {
		None => Ok(None),
		Some(Ok(bytes)) => Ok(Some(Blob::from(bytes))),
		Some(Err(data_type)) => bail!("expected a BLOB or TEXT payload at {coord:?}, found {data_type}"),
	}
}

impl Debug for MBTiles {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MBTiles").field("name", &self.inner.name).finish_non_exhaustive()
	}
}
