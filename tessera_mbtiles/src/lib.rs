//! Tessera MBTiles: an async read engine for MBTiles tile stores.
//!
//! An MBTiles file is a SQLite database holding map tiles, optional UTF-grid
//! interactivity overlays and a key/value `metadata` table. Tiles are stored in TMS row
//! order; this crate only ever speaks XYZ to its callers and flips rows at the storage
//! boundary.
//!
//! Two table layouts are in the wild and both are read transparently:
//! - a flat `tiles` table, and
//! - the MBTiles 1.1 layout of deduplicated `images` joined through a `map` table,
//!   optionally with `grid_utfgrid`/`grid_key`/`keymap` grid tables.
//!
//! # Quick start
//! ```rust,no_run
//! use tessera_mbtiles::*;
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mbtiles = MBTiles::open("/data/plain_1.mbtiles").await?;
//!
//!     let name = mbtiles.get_metadata("name").await?;
//!     let tile = mbtiles.get_tile(3, 1, 2).await?;
//!     println!("{name:?}: {} bytes of {}", tile.len(), tile.content_type());
//!
//!     let coords: Vec<String> = mbtiles.create_zxy_stream().try_collect().await?;
//!     println!("{} tiles", coords.len());
//!     Ok(())
//! }
//! ```
//!
//! # Errors
//! Misses are ordinary outcomes: [`MBTilesError::TileNotFound`],
//! [`MBTilesError::GridNotFound`] and [`MBTilesError::KeyNotFound`]. A file that exists
//! but cannot be read yields [`MBTilesError::StoreUnavailable`]; a file that does not
//! exist reads as an empty store.

mod config;
pub use config::*;

mod error;
pub use error::*;

mod grid;
pub use grid::*;

mod info;
pub use info::*;

mod metadata;

mod schema;
pub use schema::*;

mod store;
pub use store::*;

mod stream;
pub use stream::*;

mod tile;
pub use tile::*;

pub use tessera_core::{Blob, Codec, DetectCompression, TileCompression, TileCoord, TileFormat};
