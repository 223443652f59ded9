// src/utils/url.rs

//! Image URL allow-listing.
//!
//! Allowed locations are configured as URL prefixes such as
//! `https://i.redd.it/`. Matching is done on parsed URL components rather
//! than raw text, so look-alike hosts (`https://i.redd.it.evil.com/`) and
//! scheme changes (`http://i.redd.it/`) are rejected.

use url::Url;

use crate::error::{AppError, Result};

/// Set of URL prefixes that candidate image URLs must fall under.
#[derive(Debug, Clone)]
pub struct AllowList {
    prefixes: Vec<Url>,
}

impl AllowList {
    /// Parse the configured prefixes.
    ///
    /// Each prefix must be an absolute URL with a host.
    pub fn new<I, S>(prefixes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let prefixes = prefixes
            .into_iter()
            .map(|raw| {
                let raw = raw.as_ref();
                let url = Url::parse(raw)?;
                if url.host_str().is_none() {
                    return Err(AppError::config(format!(
                        "Allowed domain '{raw}' has no host"
                    )));
                }
                Ok(url)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { prefixes })
    }

    /// Whether `raw` is a valid absolute URL under one of the prefixes.
    pub fn is_allowed(&self, raw: &str) -> bool {
        let Ok(candidate) = Url::parse(raw) else {
            return false;
        };
        self.prefixes
            .iter()
            .any(|prefix| matches_prefix(prefix, &candidate))
    }
}

fn matches_prefix(prefix: &Url, candidate: &Url) -> bool {
    prefix.scheme() == candidate.scheme()
        && prefix.host_str() == candidate.host_str()
        && prefix.port_or_known_default() == candidate.port_or_known_default()
        && candidate.path().starts_with(prefix.path())
}
