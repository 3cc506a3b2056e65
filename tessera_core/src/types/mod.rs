//! Contains types like blobs, tile coordinates, tile formats and compression kinds.

mod blob;
pub use blob::*;

mod tile_compression;
pub use tile_compression::*;

mod tile_coord;
pub use tile_coord::*;

mod tile_format;
pub use tile_format::*;
