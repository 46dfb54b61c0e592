//! Dataset copy and in-place reference
//!
//! Copies every object of a dataset between locations. `meta.json` is
//! copied last so the destination only becomes readable once complete.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::meta::META_KEY;
use super::reader::HubDataset;
use crate::error::{BenchError, Result};
use crate::storage::Storage;

/// Outcome of a dataset copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyReport {
    pub objects: usize,
    pub bytes: u64,
}

/// Copy every object under `src` to the same key under `dst`
pub async fn copy_dataset(src: &Storage, dst: &Storage, overwrite: bool) -> Result<CopyReport> {
    if !overwrite && dst.object_exists(META_KEY).await? {
        return Err(BenchError::DatasetExists {
            location: dst.location().to_string(),
        });
    }

    let mut keys = src.list_objects().await?;
    if keys.is_empty() {
        return Err(BenchError::DatasetNotFound {
            location: src.location().to_string(),
        });
    }

    // Commit marker goes last
    keys.sort_by_key(|k| k == META_KEY);

    let start = Instant::now();
    let mut report = CopyReport::default();
    for key in &keys {
        let bytes = src.copy_object(key, dst, key).await?;
        debug!("Copied {} ({} bytes)", key, bytes);
        report.objects += 1;
        report.bytes += bytes;
    }

    info!(
        "Copied {} objects ({} bytes) from {} to {} in {:.2}s",
        report.objects,
        report.bytes,
        src.location(),
        dst.location(),
        start.elapsed().as_secs_f64()
    );
    Ok(report)
}

/// Use a dataset where it already lives
pub async fn reference_dataset(src: Arc<Storage>) -> Result<HubDataset> {
    let dataset = HubDataset::open(src).await?;
    info!(
        "Referencing dataset in place ({} samples, {} classes, {:?} chunks)",
        dataset.len(),
        dataset.classes().len(),
        dataset.meta().compression
    );
    Ok(dataset)
}
