//! Image classification source
//!
//! Reads the standard `root/<class>/<image>` layout: one subdirectory
//! per class, labels assigned by sorted class name.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BenchError, Result};

/// Extensions recognised as images (compared lowercase)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp",
];

/// One image file with its class label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub path: PathBuf,
    pub label: u32,
}

impl ImageEntry {
    /// Lowercase file extension, used as the tar entry suffix
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// A scanned classification dataset
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    classes: Vec<String>,
    entries: Vec<ImageEntry>,
}

impl ImageFolder {
    /// Scan a classification directory tree
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(BenchError::InputDirMissing { path: root });
        }

        let mut classes = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                classes.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        classes.sort();

        let mut entries = Vec::new();
        for (label, class) in classes.iter().enumerate() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(root.join(class))? {
                let path = entry?.path();
                if path.is_file() && is_image(&path) {
                    files.push(path);
                }
            }
            files.sort();
            entries.extend(files.into_iter().map(|path| ImageEntry {
                path,
                label: label as u32,
            }));
        }

        debug!(
            "Scanned {}: {} classes, {} images",
            root.display(),
            classes.len(),
            entries.len()
        );

        Ok(Self {
            root,
            classes,
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class names in label order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}
