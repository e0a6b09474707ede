//! One function per engine entity-action
//!
//! Each wrapper performs a single REST operation (optionally followed by a
//! wait for the state it leads to) and reports failures with the error
//! variant of the entity it acted on.

pub mod clusters;
pub mod datacenters;
pub mod hosts;
pub mod networks;
pub mod snapshots;
pub mod storagedomains;
pub mod templates;
pub mod vmpools;
pub mod vms;
