//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::Path;

pub const CLASSES: &[&str] = &["cat", "dog", "fish"];

/// Deterministic image bytes with varying length
pub fn image_bytes(idx: usize) -> Vec<u8> {
    let len = 100 + (idx * 137) % 1900;
    (0..len).map(|i| ((idx + i) % 251) as u8).collect()
}

/// Write `per_class` images into each class directory under `root`
pub fn make_image_tree(root: &Path, per_class: usize) -> usize {
    let mut idx = 0;
    for class in CLASSES {
        let dir = root.join(class);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..per_class {
            let ext = if i % 2 == 0 { "jpg" } else { "PNG" };
            std::fs::write(dir.join(format!("img_{:03}.{}", i, ext)), image_bytes(idx)).unwrap();
            idx += 1;
        }
        // Non-images are skipped
        std::fs::write(dir.join("README.txt"), b"not an image").unwrap();
    }
    idx
}
