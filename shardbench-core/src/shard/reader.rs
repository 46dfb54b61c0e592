//! Tar shard reader
//!
//! Groups consecutive tar entries sharing a key back into samples.

use bytes::Bytes;
use std::io::Read;

use super::sample::{Sample, LABEL_EXTENSION};
use crate::error::{BenchError, Result};
use crate::source::IMAGE_EXTENSIONS;

/// Partially assembled sample
#[derive(Default)]
struct Group {
    key: String,
    image: Option<(String, Bytes)>,
    label: Option<u32>,
}

impl Group {
    fn finish(self, shard: &str) -> Result<Sample> {
        let (extension, image) = self.image.ok_or_else(|| BenchError::MalformedShard {
            shard: shard.into(),
            reason: format!("sample {} has no image entry", self.key),
        })?;
        let label = self.label.ok_or_else(|| BenchError::MalformedShard {
            shard: shard.into(),
            reason: format!("sample {} has no {} entry", self.key, LABEL_EXTENSION),
        })?;
        Ok(Sample {
            key: self.key,
            extension,
            image,
            label,
        })
    }
}

/// Split an entry path into key and extension at the first dot of the file name
fn split_key(path: &str) -> Option<(&str, &str)> {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = path[name_start..].find('.')? + name_start;
    Some((&path[..dot], &path[dot + 1..]))
}

/// Parse all samples out of a tar shard held in memory
pub fn read_samples(shard: &str, data: &[u8]) -> Result<Vec<Sample>> {
    let malformed = |reason: String| BenchError::MalformedShard {
        shard: shard.into(),
        reason,
    };

    let mut archive = tar::Archive::new(data);
    let mut samples = Vec::new();
    let mut current: Option<Group> = None;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path()?.to_string_lossy().into_owned();
        let (key, extension) = split_key(&path)
            .ok_or_else(|| malformed(format!("entry {} has no extension", path)))?;
        let extension = extension.to_ascii_lowercase();

        if current.as_ref().is_some_and(|g| g.key != key) {
            if let Some(group) = current.take() {
                samples.push(group.finish(shard)?);
            }
        }
        let group = current.get_or_insert_with(|| Group {
            key: key.to_string(),
            ..Default::default()
        });

        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf)?;

        if extension == LABEL_EXTENSION {
            let text = std::str::from_utf8(&buf)
                .map_err(|_| malformed(format!("label of {} is not text", group.key)))?;
            let label = text
                .trim()
                .parse::<u32>()
                .map_err(|_| malformed(format!("label of {} is not a number: {:?}", group.key, text)))?;
            group.label = Some(label);
        } else if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            group.image = Some((extension, Bytes::from(buf)));
        }
    }

    if let Some(group) = current.take() {
        samples.push(group.finish(shard)?);
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tar_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o444);
            header.set_cksum();
            builder.append(&header, data.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("0000001.jpg"), Some(("0000001", "jpg")));
        assert_eq!(split_key("dir.x/0000001.seg.png"), Some(("dir.x/0000001", "seg.png")));
        assert_eq!(split_key("noext"), None);
    }

    #[test]
    fn test_groups_by_key() {
        let data = tar_of(&[
            ("0000001.jpg", "one"),
            ("0000001.cls", "4"),
            ("0000002.png", "two"),
            ("0000002.cls", "9"),
        ]);
        let samples = read_samples("test.tar", &data).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].key, "0000001");
        assert_eq!(samples[0].label, 4);
        assert_eq!(samples[1].extension, "png");
        assert_eq!(&samples[1].image[..], b"two");
    }

    #[test]
    fn test_missing_label() {
        let data = tar_of(&[("0000001.jpg", "one"), ("0000002.jpg", "two"), ("0000002.cls", "1")]);
        let err = read_samples("test.tar", &data).unwrap_err();
        assert!(matches!(err, BenchError::MalformedShard { .. }));
    }

    #[test]
    fn test_bad_label() {
        let data = tar_of(&[("0000001.jpg", "one"), ("0000001.cls", "cat")]);
        assert!(read_samples("test.tar", &data).is_err());
    }

    #[test]
    fn test_empty_archive() {
        let data = tar_of(&[]);
        assert!(read_samples("empty.tar", &data).unwrap().is_empty());
    }
}
