//! Generic access to engine collections
//!
//! Every entity type knows its collection path, the element name used in
//! collection responses, and the error kind its failures map to. The
//! functions here are the building blocks of the `low_level` wrappers.

use crate::client::RestClient;
use art_shared::{
    Action, ArtError, Cluster, DataCenter, Disk, DiskAttachment, EntityKind, Host, HostNic,
    Network, NetworkAttachment, Nic, Result, Snapshot, StorageDomain, Template,
    TimeoutingSampler, Vm, VmPool, VnicProfile,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

pub trait Entity: Serialize + DeserializeOwned + Debug + Send + Sync + 'static {
    const KIND: EntityKind;
    /// Path segment of the collection, e.g. `vms`
    const COLLECTION: &'static str;
    /// Key holding the element list in collection responses, e.g. `vm`
    const ELEMENT: &'static str;

    fn id(&self) -> Option<&str>;
    fn name(&self) -> Option<&str>;

    /// Id of an entity fetched from the engine
    fn require_id(&self) -> Result<&str> {
        self.id().ok_or_else(|| {
            ArtError::entity(
                Self::KIND,
                format!(
                    "{} {} has no id",
                    Self::KIND,
                    self.name().unwrap_or("<unnamed>")
                ),
            )
        })
    }
}

macro_rules! impl_entity {
    ($ty:ty, $kind:expr, $collection:literal, $element:literal, $name:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;
            const COLLECTION: &'static str = $collection;
            const ELEMENT: &'static str = $element;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn name(&self) -> Option<&str> {
                self.$name.as_deref()
            }
        }
    };
}

impl_entity!(DataCenter, EntityKind::DataCenter, "datacenters", "data_center", name);
impl_entity!(Cluster, EntityKind::Cluster, "clusters", "cluster", name);
impl_entity!(Host, EntityKind::Host, "hosts", "host", name);
impl_entity!(HostNic, EntityKind::Host, "nics", "host_nic", name);
impl_entity!(StorageDomain, EntityKind::StorageDomain, "storagedomains", "storage_domain", name);
impl_entity!(Vm, EntityKind::Vm, "vms", "vm", name);
impl_entity!(Disk, EntityKind::Disk, "disks", "disk", name);
impl_entity!(Nic, EntityKind::Nic, "nics", "nic", name);
impl_entity!(Snapshot, EntityKind::Snapshot, "snapshots", "snapshot", description);
impl_entity!(Network, EntityKind::Network, "networks", "network", name);
impl_entity!(VnicProfile, EntityKind::VnicProfile, "vnicprofiles", "vnic_profile", name);
impl_entity!(Template, EntityKind::Template, "templates", "template", name);
impl_entity!(VmPool, EntityKind::VmPool, "vmpools", "vm_pool", name);

impl Entity for DiskAttachment {
    const KIND: EntityKind = EntityKind::Disk;
    const COLLECTION: &'static str = "diskattachments";
    const ELEMENT: &'static str = "disk_attachment";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.disk.as_ref().and_then(|d| d.name.as_deref())
    }
}

impl Entity for NetworkAttachment {
    const KIND: EntityKind = EntityKind::Network;
    const COLLECTION: &'static str = "networkattachments";
    const ELEMENT: &'static str = "network_attachment";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn name(&self) -> Option<&str> {
        self.network.as_ref().and_then(|n| n.name.as_deref())
    }
}

/// Path of an element inside a collection
pub fn element_path(collection: &str, id: &str) -> String {
    format!("{collection}/{id}")
}

/// Path of the `E` sub-collection below a parent element
pub fn sub_collection<E: Entity>(parent_path: &str) -> String {
    format!("{parent_path}/{}", E::COLLECTION)
}

/// Extract the element list from a collection response
fn elements<E: Entity>(mut body: Value) -> Result<Vec<E>> {
    match body.get_mut(E::ELEMENT).map(Value::take) {
        Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list)?),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Err(ArtError::entity(
            E::KIND,
            format!("Unexpected {} collection payload: {}", E::ELEMENT, other),
        )),
    }
}

/// List a collection, optionally filtered with an engine search query
pub async fn list_in<E: Entity>(
    client: &RestClient,
    collection: &str,
    search: Option<&str>,
) -> Result<Vec<E>> {
    let body: Value = match search {
        Some(query) => {
            client
                .get_with_query(collection, &[("search", query)])
                .await?
        }
        None => client.get(collection).await?,
    };
    elements(body)
}

pub async fn list_all<E: Entity>(client: &RestClient) -> Result<Vec<E>> {
    list_in(client, E::COLLECTION, None).await
}

pub async fn search<E: Entity>(client: &RestClient, query: &str) -> Result<Vec<E>> {
    list_in(client, E::COLLECTION, Some(query)).await
}

/// Exactly one element named `name`; search matching is loose, so filter exactly
fn exactly_one<E: Entity>(candidates: Vec<E>, name: &str) -> Result<E> {
    let mut matching: Vec<E> = candidates
        .into_iter()
        .filter(|e| e.name() == Some(name))
        .collect();

    match matching.len() {
        0 => Err(ArtError::not_found(E::KIND, name)),
        1 => Ok(matching.remove(0)),
        n => Err(ArtError::entity(
            E::KIND,
            format!("{n} {}s named {name}", E::KIND),
        )),
    }
}

pub async fn find_by_name<E: Entity>(client: &RestClient, name: &str) -> Result<E> {
    find_by_query(client, &format!("name={name}"), name).await
}

/// Search with an explicit query, then require exactly one element named `name`
pub async fn find_by_query<E: Entity>(client: &RestClient, query: &str, name: &str) -> Result<E> {
    let candidates = search::<E>(client, query).await?;
    exactly_one(candidates, name)
}

/// Find by name in a sub-collection, which the engine does not let us search
pub async fn find_in<E: Entity>(client: &RestClient, collection: &str, name: &str) -> Result<E> {
    let candidates = list_in::<E>(client, collection, None).await?;
    exactly_one(candidates, name)
}

pub async fn get_by_id<E: Entity>(client: &RestClient, id: &str) -> Result<E> {
    get_at(client, &element_path(E::COLLECTION, id)).await
}

pub async fn get_at<E: Entity>(client: &RestClient, path: &str) -> Result<E> {
    client.get(path).await.map_err(|e| {
        if e.is_not_found() {
            ArtError::not_found(E::KIND, path)
        } else {
            e
        }
    })
}

pub async fn create<E: Entity>(client: &RestClient, collection: &str, entity: &E) -> Result<E> {
    tracing::debug!("Creating {} in {}: {:?}", E::KIND, collection, entity);
    client.post(collection, entity).await
}

pub async fn update<E: Entity>(client: &RestClient, path: &str, changes: &E) -> Result<E> {
    tracing::debug!("Updating {} at {}: {:?}", E::KIND, path, changes);
    client.put(path, changes).await
}

pub async fn remove(client: &RestClient, path: &str, query: &[(&str, &str)]) -> Result<()> {
    client.delete(path, query).await
}

/// Run an action on an element; a `failed` action status is an error even on 2xx
pub async fn perform_action_at(
    client: &RestClient,
    kind: EntityKind,
    path: &str,
    action_name: &str,
    action: &Action,
) -> Result<Action> {
    let response: Action = client
        .post(&format!("{path}/{action_name}"), action)
        .await?;

    if response.is_failed() {
        let fault = response.fault.unwrap_or_default();
        return Err(ArtError::entity(
            kind,
            format!(
                "Action {action_name} on {path} failed: {}",
                fault
                    .detail
                    .or(fault.reason)
                    .unwrap_or_else(|| "no fault details".to_string())
            ),
        ));
    }

    Ok(response)
}

pub async fn perform_action<E: Entity>(
    client: &RestClient,
    id: &str,
    action_name: &str,
    action: &Action,
) -> Result<Action> {
    perform_action_at(
        client,
        E::KIND,
        &element_path(E::COLLECTION, id),
        action_name,
        action,
    )
    .await
}

/// Wait until no element named `name` is left in `collection`
pub async fn wait_for_removal<E: Entity>(
    client: &RestClient,
    collection: &str,
    name: &str,
    sampler: &TimeoutingSampler,
) -> Result<()> {
    sampler
        .wait_for(
            || async move {
                let all = list_in::<E>(client, collection, None).await?;
                Ok(all.iter().any(|e| e.name() == Some(name)))
            },
            |present: &bool| !present,
        )
        .await?;
    Ok(())
}

/// Wrap remote failures of a mutating call in the entity's error variant
pub trait ResultExt<T> {
    fn or_entity_err<F>(self, kind: EntityKind, context: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn or_entity_err<F>(self, kind: EntityKind, context: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e {
            ArtError::Api { .. }
            | ArtError::Http(_)
            | ArtError::Json(_)
            | ArtError::UrlParse(_)
            | ArtError::Io(_) => ArtError::entity(kind, format!("{}: {e}", context())),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_elements_from_collection_body() {
        let vms: Vec<Vm> = elements(json!({
            "vm": [
                {"id": "1", "name": "vm_0", "status": "up"},
                {"id": "2", "name": "vm_1", "status": "down"}
            ]
        }))
        .unwrap();
        assert_eq!(vms.len(), 2);
        assert_eq!(vms[1].name.as_deref(), Some("vm_1"));
    }

    #[test]
    fn test_empty_collection_body() {
        let vms: Vec<Vm> = elements(json!({})).unwrap();
        assert!(vms.is_empty());
    }

    #[test]
    fn test_exactly_one_filters_loose_matches() {
        let candidates: Vec<Vm> = elements(json!({
            "vm": [{"id": "1", "name": "vm_0"}, {"id": "2", "name": "vm_01"}]
        }))
        .unwrap();
        let vm = exactly_one(candidates, "vm_0").unwrap();
        assert_eq!(vm.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_exactly_one_reports_missing_entity() {
        let err = exactly_one::<Host>(Vec::new(), "host_9").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "host not found: host_9");
    }

    #[test]
    fn test_snapshot_is_named_by_description() {
        let snapshot: Snapshot =
            serde_json::from_value(json!({"id": "s1", "description": "before_upgrade"})).unwrap();
        assert_eq!(Entity::name(&snapshot), Some("before_upgrade"));
    }

    #[test]
    fn test_entity_error_wrapping_keeps_timeouts() {
        let api: Result<()> = Err(ArtError::Api {
            status: 400,
            reason: "Operation Failed".to_string(),
            detail: None,
        });
        let wrapped = api.or_entity_err(EntityKind::Vm, || "Failed to start VM vm_0".to_string());
        assert!(matches!(wrapped, Err(ArtError::Vm(msg)) if msg.starts_with("Failed to start VM vm_0")));

        let timeout: Result<()> = Err(ArtError::Timeout {
            what: "vm_0".to_string(),
            timeout: std::time::Duration::from_secs(1),
            last_sample: None,
        });
        assert!(timeout
            .or_entity_err(EntityKind::Vm, || "ignored".to_string())
            .unwrap_err()
            .is_timeout());
    }
}
