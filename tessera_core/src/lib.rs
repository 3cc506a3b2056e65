//! Core types shared by the tessera crates: byte blobs, tile coordinates, tile formats and
//! the decompression codecs tile containers are read through.

pub mod compression;
pub use compression::*;

pub mod types;
pub use types::*;
