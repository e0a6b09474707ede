//! Scenario helpers composed from `low_level` calls
//!
//! These are the building blocks test suites use for setup and teardown:
//! they fan out over many entities with [`crate::parallel`] and wait for
//! every entity to settle before returning.

pub mod datacenters;
pub mod networks;
pub mod snapshots;
pub mod storagedomains;
pub mod templates;
pub mod vmpools;
pub mod vms;

use rand::distributions::Alphanumeric;
use rand::Rng;

/// `prefix` plus a short random suffix, for entities that must not collide between runs
pub fn unique_name(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("{prefix}_{}", suffix.to_lowercase())
}
