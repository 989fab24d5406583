//! Site list loading and page retrieval.

pub mod fetcher;

pub use fetcher::{HttpFetcher, PageFetcher};

use crate::error::ConfigError;
use crate::models::Site;
use std::path::Path;
use tracing::debug;

/// Read a site list: one URL per line, surrounding whitespace trimmed,
/// blank lines ignored. Duplicates are kept.
pub fn load_sites(path: &Path) -> Result<Vec<Site>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::SitesFileNotFound(path.to_path_buf()));
    }

    let content =
        std::fs::read_to_string(path).map_err(|source| ConfigError::SitesFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let sites = parse_sites(&content);
    if sites.is_empty() {
        return Err(ConfigError::EmptySiteList(path.to_path_buf()));
    }

    debug!("Loaded {} sites from {}", sites.len(), path.display());
    Ok(sites)
}

fn parse_sites(content: &str) -> Vec<Site> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
