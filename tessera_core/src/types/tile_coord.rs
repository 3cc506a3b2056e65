//! Tile coordinates in a Web Mercator tile pyramid.
//!
//! Two row conventions meet in a tile store:
//! - **XYZ**: the public convention, row 0 is the northernmost row.
//! - **TMS**: the MBTiles storage convention, row 0 is the southernmost row.
//!
//! They are related by `y_tms = 2^z - 1 - y_xyz`, an operation that is its own inverse.
//! [`TileCoord`] does not record which convention it is in; [`TileCoord::to_tms`] and
//! [`TileCoord::to_xyz`] exist so that call sites say which way they are converting.
//!
//! # Examples
//!
//! ```
//! use tessera_core::TileCoord;
//!
//! let xyz = TileCoord::from_signed(3, 1, 2).unwrap();
//! let tms = xyz.to_tms();
//! assert_eq!(tms.y, 5);
//! assert_eq!(tms.to_xyz(), xyz);
//!
//! // out of range coordinates are no coordinates at all
//! assert!(TileCoord::from_signed(0, 0, 1).is_none());
//! assert!(TileCoord::from_signed(-1, 0, 0).is_none());
//! ```

use anyhow::{Context, Result, ensure};
use std::{
	cmp::Ordering,
	f64::consts::PI,
	fmt::{self, Debug, Display},
	str::FromStr,
};

/// Deepest zoom level a coordinate may have.
pub const MAX_LEVEL: u8 = 31;

/// A tile coordinate: zoom `level`, column `x` and row `y`.
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	/// The zoom level of the tile.
	pub level: u8,
	/// The column of the tile.
	pub x: u32,
	/// The row of the tile.
	pub y: u32,
}

impl TileCoord {
	/// Create a new `TileCoord`.
	///
	/// # Errors
	/// Returns an error if `level` > 31 or `x`/`y` are outside `[0, 2^level - 1]`.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(level <= MAX_LEVEL, "level ({level}) must be <= {MAX_LEVEL}");
		let max = max_index(level);
		ensure!(x <= max, "x ({x}) out of bounds for level {level}");
		ensure!(y <= max, "y ({y}) out of bounds for level {level}");
		Ok(TileCoord { level, x, y })
	}

	/// Validate a coordinate given as signed integers, the way it arrives from a caller.
	///
	/// Returns `None` for a negative zoom, a zoom deeper than 31, or a column/row outside
	/// `[0, 2^z - 1]`. Such coordinates address nothing and must never reach storage.
	///
	/// ```
	/// use tessera_core::TileCoord;
	///
	/// assert!(TileCoord::from_signed(2, 3, 3).is_some());
	/// assert!(TileCoord::from_signed(2, 4, 0).is_none());
	/// assert!(TileCoord::from_signed(1, -1, 0).is_none());
	/// assert!(TileCoord::from_signed(32, 0, 0).is_none());
	/// ```
	#[must_use]
	pub fn from_signed(z: i64, x: i64, y: i64) -> Option<TileCoord> {
		let level = u8::try_from(z).ok().filter(|level| *level <= MAX_LEVEL)?;
		let max = i64::from(max_index(level));
		if !(0..=max).contains(&x) || !(0..=max).contains(&y) {
			return None;
		}
		Some(TileCoord {
			level,
			x: x as u32,
			y: y as u32,
		})
	}

	/// The largest valid column or row at this coordinate's level, `2^level - 1`.
	#[must_use]
	pub fn max_value(&self) -> u32 {
		max_index(self.level)
	}

	/// Flip the row in place, converting between XYZ and TMS.
	///
	/// ```
	/// use tessera_core::TileCoord;
	///
	/// let mut coord = TileCoord::new(3, 1, 2).unwrap();
	/// coord.flip_y();
	/// assert_eq!(coord.y, 5); // 7 (max) - 2 = 5
	/// ```
	pub fn flip_y(&mut self) {
		self.y = self.max_value() - self.y;
	}

	/// Interpret `self` as XYZ and return the TMS coordinate of the same tile.
	#[must_use]
	pub fn to_tms(&self) -> TileCoord {
		let mut coord = *self;
		coord.flip_y();
		coord
	}

	/// Interpret `self` as TMS and return the XYZ coordinate of the same tile.
	#[must_use]
	pub fn to_xyz(&self) -> TileCoord {
		self.to_tms()
	}

	/// Northwest corner of an XYZ tile as `[longitude, latitude]` in degrees.
	///
	/// `x` and `y` may equal `2^level` to address the south-east corner of the last tile.
	#[must_use]
	pub fn coord_to_geo(level: u8, x: u32, y: u32) -> [f64; 2] {
		let zoom: f64 = 2.0f64.powi(i32::from(level));
		[
			(f64::from(x) / zoom - 0.5) * 360.0,
			((PI * (1.0 - 2.0 * f64::from(y) / zoom)).exp().atan() / PI - 0.25) * 360.0,
		]
	}

	/// Northwest corner of this XYZ tile as `[longitude, latitude]`.
	#[must_use]
	pub fn as_geo(&self) -> [f64; 2] {
		TileCoord::coord_to_geo(self.level, self.x, self.y)
	}
}

fn max_index(level: u8) -> u32 {
	((1u64 << level) - 1) as u32
}

/// Formats as `z/x/y`.
impl Display for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}/{}", self.level, self.x, self.y)
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

/// Parses `z/x/y`.
impl FromStr for TileCoord {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		let mut parts = text.trim().split('/');
		let mut next = |name: &str| -> Result<i64> {
			let part = parts.next().with_context(|| format!("missing {name} in '{text}'"))?;
			part.parse::<i64>().with_context(|| format!("invalid {name} '{part}' in '{text}'"))
		};
		let (z, x, y) = (next("zoom")?, next("column")?, next("row")?);
		ensure!(parts.next().is_none(), "too many parts in '{text}'");
		TileCoord::from_signed(z, x, y).with_context(|| format!("'{text}' is not a valid tile coordinate"))
	}
}

/// Ordering: by zoom `level`, then column `x`, then row `y`.
impl Ord for TileCoord {
	fn cmp(&self, other: &Self) -> Ordering {
		(self.level, self.x, self.y).cmp(&(other.level, other.x, other.y))
	}
}

impl PartialOrd for TileCoord {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
