//! Version management - engine product version discovery and comparison

use crate::client::RestClient;
use art_shared::{ApiRoot, ArtError, Result, Version};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const CACHE_DURATION: Duration = Duration::from_secs(3600); // 1 hour

pub struct VersionManager {
    client: RestClient,
    cache: RwLock<Option<(Instant, Version)>>,
}

impl VersionManager {
    pub fn new(client: RestClient) -> Self {
        Self {
            client,
            cache: RwLock::new(None),
        }
    }

    /// Product version reported by the API root (with caching)
    pub async fn engine_version(&self) -> Result<Version> {
        {
            let cache = self.cache.read().await;
            if let Some((timestamp, version)) = cache.as_ref() {
                if timestamp.elapsed() < CACHE_DURATION {
                    return Ok(version.clone());
                }
            }
        }

        let root: ApiRoot = self.client.get("").await?;
        let version = root
            .product_info
            .and_then(|p| p.version)
            .ok_or_else(|| ArtError::Config("Engine did not report a product version".to_string()))?;

        tracing::info!("Engine product version: {}", version);

        {
            let mut cache = self.cache.write().await;
            *cache = Some((Instant::now(), version.clone()));
        }

        Ok(version)
    }
}

/// `true` when `version >= minimum`; unparseable versions compare as unsupported
pub fn version_at_least(version: &str, minimum: &str) -> bool {
    matches!(
        version_compare::compare(version, minimum),
        Ok(version_compare::Cmp::Gt) | Ok(version_compare::Cmp::Eq)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_at_least() {
        assert!(version_at_least("4.7", "4.4"));
        assert!(version_at_least("4.4", "4.4"));
        assert!(version_at_least("4.10", "4.9"));
        assert!(!version_at_least("4.3", "4.4"));
        assert!(!version_at_least("", "4.4"));
    }
}
