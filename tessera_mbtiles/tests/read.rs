
use futures::future::join_all;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex},
};
use tessera_mbtiles::*;
use test_utilities::*;

#[tokio::test]
async fn get_metadata() {
	let fixture = plain_1();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	let mut values = BTreeMap::new();
	for key in ["name", "type", "description", "version", "formatter", "bounds"] {
		values.insert(key, mbtiles.get_metadata(key).await.unwrap());
	}
	let text = |v: &str| Some(v.to_string());
	assert_eq!(
		values,
		BTreeMap::from([
			("name", text("plain_1")),
			("type", text("baselayer")),
			("description", text("demo description")),
			("version", text("1.0.3")),
			("formatter", None),
			("bounds", text(PLAIN_1_BOUNDS)),
		])
	);

	let err = mbtiles.get_metadata("invalid").await.unwrap_err();
	assert!(matches!(&err, MBTilesError::KeyNotFound(key) if key == "invalid"));
	assert!(err.to_string().starts_with("Key does not exist"));
}

#[tokio::test]
async fn get_tiles() {
	let fixture = plain_1();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	let mut success = 0;
	let mut missing = 0;

	for (z, x, y) in plain_1_coords() {
		let tile = mbtiles.get_tile(z.into(), x.into(), y.into()).await.unwrap();
		assert_eq!(tile.as_blob().as_slice(), png_tile(z, x, y).as_slice(), "tile {z}/{x}/{y}");
		assert_eq!(tile.content_type(), "image/png");
		success += 1;
	}

	let probes = [(0, 1, 0), (-1, 0, 0), (0, 0, -1), (3, 1, 8), (2, -3, 0), (18, 2, 3), (4, 0, 0)];
	for (z, x, y) in probes {
		let err = mbtiles.get_tile(z, x, y).await.unwrap_err();
		assert_eq!(err.to_string(), "Tile does not exist");
		missing += 1;
	}

	assert_eq!((success, missing), (52, 7));
}

#[rstest]
#[case::views(plain_1())]
#[case::joined_tables(plain_2())]
#[tokio::test]
async fn get_grids(#[case] fixture: Fixture) {
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	for (z, x, y) in plain_1_coords() {
		let result = mbtiles.get_grid(z.into(), x.into(), y.into()).await;
		if z < GRID_LEVELS {
			let grid = serde_json::to_value(result.unwrap()).unwrap();
			assert_eq!(grid, expected_grid(z, x, y), "grid {z}/{x}/{y}");
		} else {
			assert!(matches!(result, Err(MBTilesError::GridNotFound)), "grid {z}/{x}/{y}");
		}
	}

	for (z, x, y) in [(0, 1, 0), (-1, 0, 0), (1, 0, 2), (31, 0, 0)] {
		let err = mbtiles.get_grid(z, x, y).await.unwrap_err();
		assert_eq!(err.to_string(), "Grid does not exist");
	}
}

#[tokio::test]
async fn grid_cells_resolve_to_keys() {
	let fixture = plain_1();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	let grid = mbtiles.get_grid(1, 0, 1).await.unwrap();
	assert_eq!(grid.key_at(0, 0), None);
	assert_eq!(grid.key_at(3, 0), Some("1/0/1:a"));
	assert_eq!(grid.key_at(0, 2), Some("1/0/1:b"));
	assert_eq!(grid.key_at(1, 3), Some("1/0/1:c"));
	assert!(grid.data.contains_key("1/0/1:a"));
	assert!(!grid.data.contains_key("1/0/1:c"));
	assert!(!grid.data.contains_key("1/0/1:z"));
}

#[tokio::test]
async fn store_without_grids() {
	let fixture = unindexed();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	for (z, x, y) in [(0, 0, 0), (1, 1, 1), (3, 7, 0)] {
		assert!(matches!(mbtiles.get_grid(z, x, y).await, Err(MBTilesError::GridNotFound)));
	}
}

#[tokio::test]
async fn compressed_tiles_are_served_as_stored() {
	let fixture = unindexed();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	let tile = mbtiles.get_tile(3, 2, 5).await.unwrap();
	assert_eq!(tile.format(), TileFormat::MVT);
	assert_eq!(tile.content_type(), "application/x-protobuf");
	assert_eq!(tile.content_encoding(), Some("gzip"));
	assert_ne!(tile.as_blob().as_slice(), pbf_tile(3, 2, 5).as_slice());
}

#[tokio::test]
async fn tile_codec_inflates_payloads() {
	let fixture = unindexed();
	let config = MBTilesConfig::from_string("tile_compression: gzip").unwrap();
	let mbtiles = MBTiles::open_with_config(&fixture.path, config).await.unwrap();

	let tile = mbtiles.get_tile(3, 2, 5).await.unwrap();
	assert_eq!(tile.as_blob().as_slice(), pbf_tile(3, 2, 5).as_slice());
	assert_eq!(tile.content_encoding(), None);
}

#[tokio::test]
async fn mismatched_codec_is_a_decode_error() {
	let fixture = plain_1();
	let config = MBTilesConfig::from_string("tile_compression: gzip\ngrid_compression: gzip").unwrap();
	let mbtiles = MBTiles::open_with_config(&fixture.path, config).await.unwrap();

	assert!(matches!(mbtiles.get_tile(0, 0, 0).await, Err(MBTilesError::Decode(_))));
	assert!(matches!(mbtiles.get_grid(0, 0, 0).await, Err(MBTilesError::Decode(_))));
	// misses stay misses
	assert!(matches!(mbtiles.get_tile(5, 0, 0).await, Err(MBTilesError::TileNotFound)));
}

#[rstest]
#[case::views(plain_1(), TileTables::Joined, GridTables::Flat)]
#[case::joined_tables(plain_2(), TileTables::Joined, GridTables::Joined)]
#[case::flat(unindexed(), TileTables::Flat, GridTables::None)]
#[case::zero_bytes(zero_bytes(), TileTables::None, GridTables::None)]
#[case::missing(missing(), TileTables::None, GridTables::None)]
#[tokio::test]
async fn detected_schema(#[case] fixture: Fixture, #[case] tiles: TileTables, #[case] grids: GridTables) {
	let schema = MBTiles::open(&fixture.path).await.unwrap().schema().await.unwrap();
	assert_eq!((schema.tiles, schema.grids), (tiles, grids));
}

#[rstest]
#[case::zero_bytes(zero_bytes())]
#[case::missing(missing())]
#[tokio::test]
async fn empty_store_misses_everything(#[case] fixture: Fixture) {
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	assert!(matches!(mbtiles.get_tile(0, 0, 0).await, Err(MBTilesError::TileNotFound)));
	assert!(matches!(mbtiles.get_grid(0, 0, 0).await, Err(MBTilesError::GridNotFound)));
	assert!(matches!(mbtiles.get_metadata("name").await, Err(MBTilesError::KeyNotFound(_))));
}

#[tokio::test]
async fn missing_store_is_not_created() {
	let fixture = missing();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();
	assert!(mbtiles.get_tile(0, 0, 0).await.is_err());
	assert!(!fixture.path.exists());
}

#[tokio::test]
async fn corrupt_store_is_unavailable() {
	let fixture = corrupt();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	assert!(matches!(mbtiles.get_tile(0, 0, 0).await, Err(MBTilesError::StoreUnavailable(_))));
	assert!(matches!(mbtiles.get_grid(0, 0, 0).await, Err(MBTilesError::StoreUnavailable(_))));
	assert!(matches!(mbtiles.get_metadata("name").await, Err(MBTilesError::StoreUnavailable(_))));
	assert!(matches!(mbtiles.schema().await, Err(MBTilesError::StoreUnavailable(_))));

	// an invalid coordinate misses before the store is consulted
	assert!(matches!(mbtiles.get_tile(-1, 0, 0).await, Err(MBTilesError::TileNotFound)));
}

#[tokio::test]
async fn reads_queued_before_detection_all_complete() {
	let fixture = plain_1();
	let mbtiles = MBTiles::open(&fixture.path).await.unwrap();

	let tiles = plain_1_coords()
		.into_iter()
		.map(|(z, x, y)| {
			let mbtiles = mbtiles.clone();
			tokio::spawn(async move { mbtiles.get_tile(z.into(), x.into(), y.into()).await.map(Tile::into_blob) })
		})
		.collect::<Vec<_>>();
	let names = (0..10).map(|_| mbtiles.get_metadata("name"));

	let (tiles, names) = tokio::join!(join_all(tiles), join_all(names));

	for (result, (z, x, y)) in tiles.into_iter().zip(plain_1_coords()) {
		assert_eq!(result.unwrap().unwrap().into_vec(), png_tile(z, x, y));
	}
	for name in names {
		assert_eq!(name.unwrap(), Some("plain_1".to_string()));
	}
}

/// Passes tiles through and remembers the order they were read in.
#[derive(Debug, Default)]
struct ReadOrder(Mutex<Vec<Vec<u8>>>);

impl Codec for ReadOrder {
	fn decompress(&self, blob: Blob) -> anyhow::Result<Blob> {
		self.0.lock().unwrap().push(blob.as_slice().to_vec());
		Ok(blob)
	}
}

#[tokio::test]
async fn reads_queued_before_detection_run_in_issue_order() {
	let fixture = plain_1();
	let order = Arc::new(ReadOrder::default());
	let config = MBTilesConfig {
		pool_size: 4,
		..MBTilesConfig::default()
	};
	let mbtiles = MBTiles::open_with_codecs(&fixture.path, config, order.clone(), Arc::new(DetectCompression))
		.await
		.unwrap();

	// on this single-threaded runtime detection cannot start before every read is queued
	let coords: Vec<_> = plain_1_coords().into_iter().rev().take(20).collect();
	let results = join_all(coords.iter().map(|&(z, x, y)| mbtiles.get_tile(z.into(), x.into(), y.into()))).await;
	assert!(results.iter().all(Result::is_ok));

	let expected: Vec<Vec<u8>> = coords.iter().map(|&(z, x, y)| png_tile(z, x, y)).collect();
	assert_eq!(*order.0.lock().unwrap(), expected);
}

#[tokio::test]
async fn get_info() {
	let fixture = plain_1();
	let info = MBTiles::open(&fixture.path).await.unwrap().get_info().await.unwrap();

	assert_eq!(info.id, "plain_1");
	assert_eq!(info.basename, "plain_1.mbtiles");
	assert_eq!(info.scheme, "tms");
	assert_eq!((info.minzoom, info.maxzoom), (Some(0), Some(3)));
	assert_eq!(
		info.bounds,
		Some([-179.9999999749438, -69.99999999526695, 179.9999999749438, 84.99999999782301])
	);
	assert_eq!(info.center.map(|c| c[2]), Some(1.0));
	assert_eq!(info.properties.get("formatter"), None);
	assert_eq!(info.properties.get("type").map(String::as_str), Some("baselayer"));
}
