//! Tar shard writer
//!
//! Writes samples sequentially into `<name>-<split>-%06d.tar` files,
//! rotating to a new shard before either the byte or the sample limit
//! would be exceeded.

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::index::{ShardIndex, ShardMetadata};
use super::sample::{Sample, TRAILER_SIZE};
use super::shard_file_name;
use crate::error::{BenchError, Result};
use crate::source::ImageFolder;

/// Configuration for the shard writer
#[derive(Debug, Clone)]
pub struct ShardWriterConfig {
    /// Maximum shard size in bytes, end-of-archive trailer included
    pub max_size: u64,
    /// Maximum samples per shard (values below 1 are treated as 1)
    pub max_count: u64,
}

impl Default for ShardWriterConfig {
    fn default() -> Self {
        Self {
            max_size: crate::DEFAULT_MAX_SHARD_SIZE,
            max_count: crate::DEFAULT_MAX_SHARD_COUNT,
        }
    }
}

/// Writer that tracks bytes written and their CRC32C
struct ChecksumWriter<W> {
    inner: W,
    crc32c: u32,
    written: u64,
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.crc32c = crc32c::crc32c_append(self.crc32c, &buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// The shard currently being filled
struct OpenShard {
    shard_id: u32,
    object_key: String,
    builder: tar::Builder<ChecksumWriter<BufWriter<File>>>,
    sample_count: u64,
    /// Entry bytes appended so far, trailer excluded
    byte_size: u64,
}

impl OpenShard {
    fn create(dir: &Path, shard_id: u32, object_key: String) -> Result<Self> {
        let file = File::create(dir.join(&object_key))?;
        let writer = ChecksumWriter {
            inner: BufWriter::new(file),
            crc32c: 0,
            written: 0,
        };
        Ok(Self {
            shard_id,
            object_key,
            builder: tar::Builder::new(writer),
            sample_count: 0,
            byte_size: 0,
        })
    }

    fn append(&mut self, sample: &Sample, mtime: u64) -> Result<()> {
        append_entry(&mut self.builder, &sample.image_entry_name(), &sample.image, mtime)?;
        append_entry(&mut self.builder, &sample.label_entry_name(), &sample.label_bytes(), mtime)?;
        self.sample_count += 1;
        self.byte_size += sample.tar_size();
        Ok(())
    }

    fn close(self) -> Result<ShardMetadata> {
        let mut writer = self.builder.into_inner()?;
        writer.flush()?;
        debug_assert_eq!(writer.written, self.byte_size + TRAILER_SIZE);

        Ok(ShardMetadata {
            shard_id: self.shard_id,
            object_key: self.object_key,
            byte_size: writer.written,
            sample_count: self.sample_count,
            crc32c: writer.crc32c,
        })
    }
}

fn append_entry<W: Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    data: &[u8],
    mtime: u64,
) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    // Fails for names over 100 bytes rather than emitting long-name records
    header.set_path(name)?;
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o444);
    header.set_mtime(mtime);
    header.set_cksum();
    builder.append(&header, data)?;
    Ok(())
}

/// Sequential tar shard writer
pub struct ShardWriter {
    output_dir: PathBuf,
    config: ShardWriterConfig,
    index: ShardIndex,
    keys: HashSet<String>,
    current: Option<OpenShard>,
    mtime: u64,
}

impl ShardWriter {
    /// Create a writer for `output_dir`, which must already exist
    pub fn new(
        output_dir: impl AsRef<Path>,
        name: &str,
        split: &str,
        classes: Vec<String>,
        config: ShardWriterConfig,
    ) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.is_dir() {
            return Err(BenchError::OutputDirMissing { path: output_dir });
        }

        Ok(Self {
            output_dir,
            config,
            index: ShardIndex::new(name, split, classes),
            keys: HashSet::new(),
            current: None,
            mtime: chrono::Utc::now().timestamp().max(0) as u64,
        })
    }

    /// Append a sample, opening a new shard first if it would not fit
    pub fn write(&mut self, sample: &Sample) -> Result<()> {
        if self.keys.contains(&sample.key) {
            return Err(BenchError::DuplicateKey {
                key: sample.key.clone(),
            });
        }

        let needed = sample.tar_size();
        if needed + TRAILER_SIZE > self.config.max_size {
            return Err(BenchError::SampleTooLarge {
                key: sample.key.clone(),
                needed: needed + TRAILER_SIZE,
                limit: self.config.max_size,
            });
        }

        let rotate = match &self.current {
            Some(shard) => {
                shard.sample_count >= self.config.max_count.max(1)
                    || shard.byte_size + needed + TRAILER_SIZE > self.config.max_size
            }
            None => false,
        };
        if rotate {
            self.close_current()?;
        }

        if self.current.is_none() {
            self.open_next()?;
        }

        if let Some(shard) = self.current.as_mut() {
            shard.append(sample, self.mtime)?;
        }
        self.keys.insert(sample.key.clone());
        Ok(())
    }

    /// Close the last shard and write the index file
    pub fn finish(mut self) -> Result<ShardIndex> {
        self.close_current()?;

        let index_name = ShardIndex::file_name(&self.index.name, &self.index.split);
        std::fs::write(self.output_dir.join(&index_name), self.index.to_json()?)?;

        info!(
            "Wrote {} samples into {} shards ({} bytes), index {}",
            self.index.total_samples,
            self.index.shards.len(),
            self.index.total_bytes(),
            index_name
        );

        Ok(self.index)
    }

    fn open_next(&mut self) -> Result<()> {
        let shard_id = self.index.shards.len() as u32;
        let object_key = shard_file_name(&self.index.name, &self.index.split, shard_id);
        debug!("Opening shard {}", object_key);
        self.current = Some(OpenShard::create(&self.output_dir, shard_id, object_key)?);
        Ok(())
    }

    fn close_current(&mut self) -> Result<()> {
        if let Some(shard) = self.current.take() {
            let meta = shard.close()?;
            info!(
                "Closed shard {} ({} samples, {} bytes)",
                meta.object_key, meta.sample_count, meta.byte_size
            );
            self.index.push(meta);
        }
        Ok(())
    }
}

/// Shard a classification dataset in one pass
///
/// Indices are shuffled once (deterministically when `seed` is given) and
/// each image is stored under its zero-padded original index.
pub fn write_shards(
    folder: &ImageFolder,
    output_dir: impl AsRef<Path>,
    name: &str,
    split: &str,
    config: ShardWriterConfig,
    seed: Option<u64>,
) -> Result<ShardIndex> {
    let mut writer = ShardWriter::new(output_dir, name, split, folder.classes().to_vec(), config)?;

    let mut order: Vec<usize> = (0..folder.len()).collect();
    match seed {
        Some(seed) => order.shuffle(&mut StdRng::seed_from_u64(seed)),
        None => order.shuffle(&mut rand::thread_rng()),
    }

    for idx in order {
        let entry = &folder.entries()[idx];
        let image = Bytes::from(std::fs::read(&entry.path)?);
        let sample = Sample::new(format!("{:07}", idx), entry.extension(), image, entry.label);
        writer.write(&sample)?;
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(key: &str, len: usize) -> Sample {
        Sample::new(key, "jpg", Bytes::from(vec![1u8; len]), 3)
    }

    #[test]
    fn test_rotates_on_count() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShardWriterConfig {
            max_size: 1 << 20,
            max_count: 2,
        };
        let mut writer = ShardWriter::new(dir.path(), "ds", "train", vec![], config).unwrap();
        for i in 0..5 {
            writer.write(&sample(&format!("{:07}", i), 10)).unwrap();
        }
        let index = writer.finish().unwrap();

        let counts: Vec<u64> = index.shards.iter().map(|s| s.sample_count).collect();
        assert_eq!(counts, vec![2, 2, 1]);
        assert!(dir.path().join("ds-train-000002.tar").exists());
        assert!(dir.path().join("ds-train-index.json").exists());
    }

    #[test]
    fn test_rotates_on_size() {
        let dir = tempfile::tempdir().unwrap();
        // One 1000-byte sample is 1536 + 1024 bytes; two fit with the trailer, three do not
        let config = ShardWriterConfig {
            max_size: 2 * 2560 + TRAILER_SIZE,
            max_count: 100,
        };
        let mut writer = ShardWriter::new(dir.path(), "ds", "train", vec![], config.clone()).unwrap();
        for i in 0..5 {
            writer.write(&sample(&format!("{:07}", i), 1000)).unwrap();
        }
        let index = writer.finish().unwrap();

        for shard in &index.shards {
            assert!(shard.byte_size <= config.max_size);
            let on_disk = std::fs::metadata(dir.path().join(&shard.object_key)).unwrap().len();
            assert_eq!(on_disk, shard.byte_size);
        }
        assert_eq!(index.shards.len(), 3);
        assert_eq!(index.total_samples, 5);
    }

    #[test]
    fn test_duplicate_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer =
            ShardWriter::new(dir.path(), "ds", "train", vec![], ShardWriterConfig::default()).unwrap();
        writer.write(&sample("0000001", 4)).unwrap();
        let err = writer.write(&sample("0000001", 4)).unwrap_err();
        assert!(matches!(err, BenchError::DuplicateKey { key } if key == "0000001"));
    }

    #[test]
    fn test_sample_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShardWriterConfig {
            max_size: 4096,
            max_count: 10,
        };
        let mut writer = ShardWriter::new(dir.path(), "ds", "train", vec![], config).unwrap();
        let err = writer.write(&sample("0000000", 8192)).unwrap_err();
        assert!(matches!(err, BenchError::SampleTooLarge { .. }));
    }

    #[test]
    fn test_missing_output_dir() {
        let result = ShardWriter::new("/no/such/dir", "ds", "train", vec![], ShardWriterConfig::default());
        assert!(matches!(result, Err(BenchError::OutputDirMissing { .. })));
    }
}
