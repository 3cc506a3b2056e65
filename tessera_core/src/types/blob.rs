//! This module provides the [`Blob`] struct, an owned byte buffer used for tile payloads,
//! grid blobs and anything else read out of a tile store.
//!
//! # Examples
//!
//! ```rust
//! use tessera_core::Blob;
//!
//! let blob = Blob::from(vec![0x89, 0x50, 0x4E, 0x47]);
//! assert_eq!(blob.len(), 4);
//! assert_eq!(blob.range(1..4), b"PNG");
//!
//! let text = Blob::from("{\"grid\":[]}");
//! assert_eq!(text.as_str().unwrap(), "{\"grid\":[]}");
//! ```

use anyhow::{Context, Result};
use std::{fmt::Debug, ops::Range};

/// A thin wrapper around [`Vec<u8>`].
///
/// Blobs are handed out by value: a reader never keeps a reference to a blob it returned.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
	/// Creates an empty `Blob`.
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	/// Returns the bytes in `range`.
	///
	/// # Panics
	///
	/// Panics if `range` is out of bounds.
	#[must_use]
	pub fn range(&self, range: Range<usize>) -> &[u8] {
		&self.0[range]
	}

	/// Returns up to the first `count` bytes. Shorter blobs are returned whole.
	#[must_use]
	pub fn prefix(&self, count: usize) -> &[u8] {
		&self.0[..count.min(self.0.len())]
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// Interprets the bytes as UTF-8.
	///
	/// # Errors
	///
	/// Returns an error if the blob is not valid UTF-8.
	pub fn as_str(&self) -> Result<&str> {
		std::str::from_utf8(&self.0).context("blob is not valid UTF-8")
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(vec: Vec<u8>) -> Self {
		Blob(vec)
	}
}

impl From<&[u8]> for Blob {
	fn from(slice: &[u8]) -> Self {
		Blob(slice.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(array: &[u8; N]) -> Self {
		Blob(array.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(text: &str) -> Self {
		Blob(text.as_bytes().to_vec())
	}
}

impl From<String> for Blob {
	fn from(text: String) -> Self {
		Blob(text.into_bytes())
	}
}

impl From<Blob> for Vec<u8> {
	fn from(blob: Blob) -> Self {
		blob.0
	}
}

impl AsRef<[u8]> for Blob {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let head = self
			.prefix(8)
			.iter()
			.map(|b| format!("{b:02x}"))
			.collect::<Vec<_>>()
			.join(" ");
		if self.len() > 8 {
			write!(f, "Blob({}: {head} ...)", self.len())
		} else {
			write!(f, "Blob({}: {head})", self.len())
		}
	}
}
