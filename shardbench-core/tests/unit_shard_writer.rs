//! Shard writer properties over a real directory tree
//!
//! Unique keys, complete coverage, and per-shard limits.

mod common;

use std::collections::HashSet;

use shardbench_core::shard::{read_samples, write_shards, ShardIndex, ShardWriterConfig};
use shardbench_core::source::ImageFolder;
use shardbench_core::BenchError;

fn write(per_class: usize, config: ShardWriterConfig) -> (tempfile::TempDir, ShardIndex, usize) {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let total = common::make_image_tree(input.path(), per_class);

    let folder = ImageFolder::scan(input.path()).unwrap();
    assert_eq!(folder.len(), total);
    assert_eq!(folder.classes(), common::CLASSES);

    let index = write_shards(&folder, output.path(), "toy", "train", config, Some(7)).unwrap();
    (output, index, total)
}

#[test]
fn test_keys_unique_and_complete() {
    let config = ShardWriterConfig {
        max_size: 16 * 1024,
        max_count: 4,
    };
    let (output, index, total) = write(9, config);

    let mut keys = HashSet::new();
    let mut read_back = 0;
    for shard in &index.shards {
        let data = std::fs::read(output.path().join(&shard.object_key)).unwrap();
        for sample in read_samples(&shard.object_key, &data).unwrap() {
            assert!(keys.insert(sample.key.clone()), "duplicate key {}", sample.key);
            assert!(sample.label < common::CLASSES.len() as u32);
            read_back += 1;
        }
    }

    assert_eq!(read_back, total);
    assert_eq!(index.total_samples, total as u64);
}

#[test]
fn test_shards_respect_limits() {
    let config = ShardWriterConfig {
        max_size: 8 * 1024,
        max_count: 5,
    };
    let (output, index, _) = write(10, config.clone());
    assert!(index.shards.len() > 1);

    for shard in &index.shards {
        let path = output.path().join(&shard.object_key);
        let data = std::fs::read(&path).unwrap();

        assert!(data.len() as u64 <= config.max_size, "{} is {} bytes", shard.object_key, data.len());
        assert!(shard.sample_count <= config.max_count);
        assert_eq!(shard.byte_size, data.len() as u64);
        assert_eq!(shard.crc32c, crc32c::crc32c(&data));
    }
}

#[test]
fn test_index_written_next_to_shards() {
    let (output, index, _) = write(2, ShardWriterConfig::default());

    let raw = std::fs::read(output.path().join(ShardIndex::file_name("toy", "train"))).unwrap();
    let on_disk = ShardIndex::from_json(&raw).unwrap();
    assert_eq!(on_disk.shards, index.shards);
    assert_eq!(on_disk.classes, common::CLASSES);
    assert_eq!(index.shards[0].object_key, "toy-train-000000.tar");
}

#[test]
fn test_same_seed_same_order() {
    let input = tempfile::tempdir().unwrap();
    common::make_image_tree(input.path(), 4);
    let folder = ImageFolder::scan(input.path()).unwrap();

    let mut orders = Vec::new();
    for _ in 0..2 {
        let output = tempfile::tempdir().unwrap();
        let index = write_shards(&folder, output.path(), "toy", "val", ShardWriterConfig::default(), Some(3)).unwrap();
        let data = std::fs::read(output.path().join(&index.shards[0].object_key)).unwrap();
        let keys: Vec<String> = read_samples("s", &data).unwrap().into_iter().map(|s| s.key).collect();
        orders.push(keys);
    }
    assert_eq!(orders[0], orders[1]);
}

#[test]
fn test_missing_directories() {
    let dir = tempfile::tempdir().unwrap();

    let err = ImageFolder::scan(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, BenchError::InputDirMissing { .. }));
    assert!(err.is_missing_dir());

    common::make_image_tree(dir.path(), 1);
    let folder = ImageFolder::scan(dir.path()).unwrap();
    let err = write_shards(
        &folder,
        dir.path().join("absent"),
        "toy",
        "train",
        ShardWriterConfig::default(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, BenchError::OutputDirMissing { .. }));
}
