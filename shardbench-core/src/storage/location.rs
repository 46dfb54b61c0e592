//! Dataset location parsing
//!
//! Accepts `s3://bucket/prefix`, `file:///path` or a plain path.

use std::fmt;
use std::path::PathBuf;

use crate::error::{BenchError, Result};

/// Where a dataset lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLocation {
    /// Directory on the local filesystem
    Local { root: PathBuf },
    /// Prefix inside an S3-compatible bucket
    S3 { bucket: String, prefix: String },
}

impl DatasetLocation {
    /// Parse a location string
    pub fn parse(location: &str) -> Result<Self> {
        let invalid = |reason: &str| BenchError::InvalidLocation {
            location: location.into(),
            reason: reason.into(),
        };

        if location.is_empty() {
            return Err(invalid("empty location"));
        }

        if let Some(rest) = location.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(invalid("missing bucket name"));
            }
            return Ok(DatasetLocation::S3 {
                bucket: bucket.into(),
                prefix: prefix.trim_matches('/').into(),
            });
        }

        if let Some(path) = location.strip_prefix("file://") {
            if path.is_empty() {
                return Err(invalid("missing path"));
            }
            return Ok(DatasetLocation::Local { root: path.into() });
        }

        if let Some((scheme, _)) = location.split_once("://") {
            return Err(invalid(&format!("unsupported scheme {}", scheme)));
        }

        Ok(DatasetLocation::Local {
            root: location.into(),
        })
    }
}

impl fmt::Display for DatasetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLocation::Local { root } => write!(f, "{}", root.display()),
            DatasetLocation::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{}", bucket),
            DatasetLocation::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
        }
    }
}

impl std::str::FromStr for DatasetLocation {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_s3() {
        let loc = DatasetLocation::parse("s3://bucket/imagenet/train/").unwrap();
        assert_eq!(
            loc,
            DatasetLocation::S3 {
                bucket: "bucket".into(),
                prefix: "imagenet/train".into()
            }
        );
        assert_eq!(loc.to_string(), "s3://bucket/imagenet/train");

        let bare = DatasetLocation::parse("s3://bucket").unwrap();
        assert_eq!(bare.to_string(), "s3://bucket");
    }

    #[test]
    fn test_parse_local() {
        assert_eq!(
            DatasetLocation::parse("file:///data/shards").unwrap(),
            DatasetLocation::Local { root: "/data/shards".into() }
        );
        assert_eq!(
            DatasetLocation::parse("./shards").unwrap(),
            DatasetLocation::Local { root: "./shards".into() }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(DatasetLocation::parse("").is_err());
        assert!(DatasetLocation::parse("s3:///prefix").is_err());
        assert!(DatasetLocation::parse("gcs://bucket/x").is_err());
    }
}
