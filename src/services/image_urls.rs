//! Turns bucket-relative image paths into publicly fetchable URLs.
//!
//! Resolution is a local string operation; no request is made to object
//! storage at read time.

use anyhow::{Context, Result, anyhow};
use reqwest::Url;

/// Maps a stored object path to the URL clients fetch it from.
pub trait ImageUrlResolver: Send + Sync {
    fn public_url(&self, path: &str) -> String;
}

/// Resolver for public buckets laid out as
/// `{base_url}/storage/v1/object/public/{bucket}/{path}`.
#[derive(Clone, Debug)]
pub struct PublicBucketResolver {
    prefix: Url,
}

impl PublicBucketResolver {
    pub fn new(base_url: &str, bucket: &str) -> Result<Self> {
        let mut prefix = Url::parse(base_url)
            .with_context(|| format!("parsing storage base URL `{}`", base_url))?;
        prefix
            .path_segments_mut()
            .map_err(|_| anyhow!("storage base URL `{}` cannot carry a path", base_url))?
            .pop_if_empty()
            .extend(["storage", "v1", "object", "public"])
            .push(bucket.trim_matches('/'));
        Ok(Self { prefix })
    }
}

impl ImageUrlResolver for PublicBucketResolver {
    /// Each `/`-separated segment of `path` is percent-encoded on its own.
    fn public_url(&self, path: &str) -> String {
        let mut url = self.prefix.clone();
        // `new` already proved the prefix can carry segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        url.into()
    }
}
