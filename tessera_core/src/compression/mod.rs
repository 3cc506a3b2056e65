//! # Compression Module
//!
//! Decompression of tile payloads and UTF-grid blobs.
//!
//! Readers never call a decompressor directly; they are handed a [`Codec`] and call
//! [`Codec::decompress`] on every blob they read. [`TileCompression`](crate::TileCompression)
//! is itself a codec for a fixed compression, and [`DetectCompression`] sniffs the
//! compression from each blob's header.
//!
//! ## Usage
//! ```rust
//! use tessera_core::*;
//!
//! let json = Blob::from("{\"grid\":[\" \"],\"keys\":[\"\"]}");
//! let deflated = compress_zlib(&json)?;
//! assert_eq!(DetectCompression.decompress(deflated)?, json);
//! assert_eq!(DetectCompression.decompress(json.clone())?, json);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod codec;
mod inflate;

pub use codec::*;
pub use inflate::*;
