//! # Object-Storage Artifact URLs
//!
//! In artifact mode a package may point at a prebuilt archive in an
//! S3-compatible bucket. [`ObjectLocation::parse`] decodes the bucket, region,
//! key, and declared version from either URL dialect:
//!
//! | Host labels | Form | Bucket | Region |
//! |---|---|---|---|
//! | 3 | `s3.amazonaws.com/<bucket>/...` | first path segment | default |
//! | 3 | `s3-<region>.amazonaws.com/<bucket>/...` | first path segment | label 0 |
//! | 4 | `s3.<region>.amazonaws.com/<bucket>/...` | first path segment | label 1 |
//! | 4 | `<bucket>.s3.amazonaws.com/...` | label 0 | default |
//! | 4 | `<bucket>.s3-<region>.amazonaws.com/...` | label 0 | label 1 |
//! | 5 | `<bucket>.s3.<region>.amazonaws.com/...` | label 0 | label 2 |
//!
//! The first path segment after the bucket must be a semantic version: it is
//! the artifact's declared version. Bucket names containing dots are not
//! supported by the virtual-host forms.

use std::fmt;

use semver::Version;
use url::Url;

use crate::error::{Error, Result};

/// Region used when the host does not name one.
pub const DEFAULT_REGION: &str = "us-east-1";

const SERVICE_DOMAIN: [&str; 2] = ["amazonaws", "com"];

/// A decoded bucket + key reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub region: String,
    /// Object key, without a leading slash. Starts with the version segment.
    pub key: String,
    pub version: Version,
    /// True when the URL used the path-style dialect.
    pub path_style: bool,
}

impl ObjectLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| invalid(raw, e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid(raw, "missing host"))?
            .to_ascii_lowercase();
        let labels: Vec<&str> = host.split('.').collect();

        if labels.len() < 3 || labels[labels.len() - 2..] != SERVICE_DOMAIN {
            return Err(invalid(raw, "host is not an object-storage endpoint"));
        }

        let (bucket, region, path_style) = match labels.len() {
            3 => (None, region_of_service_label(labels[0]), true),
            4 if labels[0] == "s3" => (None, Some(labels[1].to_string()), true),
            4 => {
                let region = region_of_service_label(labels[1]);
                (Some(labels[0].to_string()), region, false)
            }
            5 if labels[1] == "s3" => {
                (Some(labels[0].to_string()), Some(labels[2].to_string()), false)
            }
            _ => return Err(invalid(raw, "unsupported host label layout")),
        };
        let region = match region {
            Some(region) => region,
            None if is_service_label(labels[if path_style { 0 } else { 1 }]) => {
                DEFAULT_REGION.to_string()
            }
            None => return Err(invalid(raw, "host is not an object-storage endpoint")),
        };

        let mut segments: Vec<String> = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let bucket = match bucket {
            Some(bucket) => bucket,
            None => {
                if segments.is_empty() {
                    return Err(invalid(raw, "missing bucket in path"));
                }
                segments.remove(0)
            }
        };
        if bucket.is_empty() {
            return Err(invalid(raw, "empty bucket name"));
        }

        let first = segments
            .first()
            .ok_or_else(|| invalid(raw, "missing version segment after bucket"))?;
        let version = crate::version::parse(first).ok_or_else(|| {
            invalid(
                raw,
                format!("first path segment '{}' is not a semantic version", first),
            )
        })?;
        if segments.len() < 2 {
            return Err(invalid(raw, "missing object name after version"));
        }

        Ok(Self {
            bucket,
            region,
            key: segments.join("/"),
            version,
            path_style,
        })
    }

    /// Canonical virtual-host HTTPS URL of the object.
    pub fn https_url(&self) -> String {
        if self.region == DEFAULT_REGION {
            format!("https://{}.s3.amazonaws.com/{}", self.bucket, self.key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, self.key
            )
        }
    }

    /// The last key segment.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

fn is_service_label(label: &str) -> bool {
    label == "s3" || label.starts_with("s3-")
}

/// `s3-eu-west-1` names a region; plain `s3` does not.
fn region_of_service_label(label: &str) -> Option<String> {
    label
        .strip_prefix("s3-")
        .filter(|region| !region.is_empty())
        .map(|region| region.to_string())
}

fn invalid(url: &str, message: impl Into<String>) -> Error {
    Error::ObjectStorageUrl {
        url: url.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_labels_path_style_default_region() {
        let loc = ObjectLocation::parse("https://s3.amazonaws.com/artifacts/1.2.0/hooks.tar.gz").unwrap();
        assert_eq!(loc.bucket, "artifacts");
        assert_eq!(loc.region, DEFAULT_REGION);
        assert_eq!(loc.key, "1.2.0/hooks.tar.gz");
        assert_eq!(loc.version, Version::new(1, 2, 0));
        assert!(loc.path_style);
    }

    #[test]
    fn test_three_labels_dash_region() {
        let loc = ObjectLocation::parse("https://s3-eu-west-1.amazonaws.com/artifacts/v2.0.0/a.tgz").unwrap();
        assert_eq!(loc.region, "eu-west-1");
        assert_eq!(loc.bucket, "artifacts");
    }

    #[test]
    fn test_four_labels_path_style_region() {
        let loc = ObjectLocation::parse("https://s3.eu-north-1.amazonaws.com/artifacts/1.0.0/x.tar.gz").unwrap();
        assert_eq!(loc.region, "eu-north-1");
        assert_eq!(loc.bucket, "artifacts");
        assert!(loc.path_style);
    }

    #[test]
    fn test_four_labels_virtual_host() {
        let loc = ObjectLocation::parse("https://artifacts.s3.amazonaws.com/1.0.0/x.tar.gz").unwrap();
        assert_eq!(loc.bucket, "artifacts");
        assert_eq!(loc.region, DEFAULT_REGION);
        assert!(!loc.path_style);

        let loc = ObjectLocation::parse("https://artifacts.s3-us-west-2.amazonaws.com/1.0.0/x.tar.gz").unwrap();
        assert_eq!(loc.region, "us-west-2");
    }

    #[test]
    fn test_five_labels_virtual_host_region() {
        let loc = ObjectLocation::parse("https://hooks.s3.eu-north-1.amazonaws.com/v1.3.0/kodjin/hooks.tar.gz").unwrap();
        assert_eq!(loc.bucket, "hooks");
        assert_eq!(loc.region, "eu-north-1");
        assert_eq!(loc.key, "v1.3.0/kodjin/hooks.tar.gz");
        assert_eq!(loc.file_name(), "hooks.tar.gz");
        assert_eq!(loc.https_url(), "https://hooks.s3.eu-north-1.amazonaws.com/v1.3.0/kodjin/hooks.tar.gz");
    }

    #[test]
    fn test_version_segment_required() {
        let err = ObjectLocation::parse("https://hooks.s3.amazonaws.com/latest/hooks.tar.gz").unwrap_err();
        assert!(format!("{}", err).contains("not a semantic version"));

        assert!(ObjectLocation::parse("https://hooks.s3.amazonaws.com/1.0.0").is_err());
        assert!(ObjectLocation::parse("https://s3.amazonaws.com/bucket-only").is_err());
    }

    #[test]
    fn test_rejects_non_object_storage_hosts() {
        assert!(ObjectLocation::parse("https://example.com/1.0.0/x.tgz").is_err());
        assert!(ObjectLocation::parse("https://a.b.c.d.e.amazonaws.com/1.0.0/x").is_err());
        assert!(ObjectLocation::parse("https://bucket.ec2.amazonaws.com/1.0.0/x").is_err());
        assert!(ObjectLocation::parse("not a url").is_err());
    }
}
