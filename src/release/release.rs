//! A release artifact published at a URL.

use crate::error::Error;
use crate::kvs::file::validate_key;

use percent_encoding::percent_decode_str;
use reqwest::Url;
use std::convert::TryFrom;

/// Represents a release artifact and the store key it is cached under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// URL of the artifact.
    pub url: Url,
    /// Key used to cache the artifact, usually the archive file name.
    pub key: String,
}

impl Release {
    /// Creates a new [`Release`] cached under an explicit key.
    ///
    /// With [`Release::try_from`] the key is the last segment of the URL path:
    ///
    /// ```rust
    /// use dewy::release::Release;
    /// use reqwest::Url;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let url = Url::parse("https://example.com/download/app-v1.0.0.zip")?;
    /// assert_eq!(
    ///     Release::try_from(&url)?,
    ///     Release::new(&url, "app-v1.0.0.zip"),
    /// );
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(url: &Url, key: &str) -> Self {
        Self {
            url: url.clone(),
            key: String::from(key),
        }
    }

    /// The key without its `.zip` extension, used to name activation directories.
    pub fn version(&self) -> &str {
        self.key.strip_suffix(".zip").unwrap_or(&self.key)
    }
}

impl TryFrom<&Url> for Release {
    type Error = crate::error::Error;

    fn try_from(value: &Url) -> Result<Self, Self::Error> {
        let segment = value
            .path_segments()
            .ok_or_else(|| {
                Error::InvalidUrl(format!(
                    "The url \"{}\" does not contain a valid path",
                    value
                ))
            })?
            .next_back()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| {
                Error::InvalidUrl(format!("The url \"{}\" does not contain a file name", value))
            })?;

        let key = percent_decode_str(segment).decode_utf8().map_err(|e| {
            Error::InvalidUrl(format!(
                "The url \"{}\" has a file name that is not UTF-8: {}",
                value, e
            ))
        })?;
        validate_key(&key).map_err(|e| {
            Error::InvalidUrl(format!("The url \"{}\" cannot name a release: {}", value, e))
        })?;

        Ok(Release::new(value, &key))
    }
}

impl TryFrom<&str> for Release {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Url::parse(value)
            .map_err(|e| {
                Error::InvalidUrl(format!("The url \"{}\" cannot be parsed: {}", value, e))
            })
            .and_then(|u| Release::try_from(&u))
    }
}
