//! Network provisioning
//!
//! Every run gets a fresh, fixed set of networks. Networks left behind by a
//! previous run are found through the marker labels and pruned before the
//! new set is created, so repeated runs do not pile up networks on the host.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::BurnConfig;
use crate::error::{BurnError, BurnResult};
use crate::traits::ContainerRuntime;
use crate::workload::WorkIndex;

/// Ordered, fixed-length set of network ids
///
/// Written once during provisioning and read-only afterwards. Clones share
/// the same slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSet {
    ids: Arc<[String]>,
}

impl NetworkSet {
    /// Wrap provisioned network ids; the set must not be empty
    pub fn new(ids: Vec<String>) -> BurnResult<Self> {
        if ids.is_empty() {
            return Err(BurnError::config("network set must not be empty"));
        }
        Ok(Self { ids: ids.into() })
    }

    /// Network assigned to `index`: round-robin over the set
    pub fn for_index(&self, index: WorkIndex) -> &str {
        let slot = (index.0 % self.ids.len() as u64) as usize;
        &self.ids[slot]
    }

    /// All ids, in provisioning order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of networks
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set holds no networks
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// `key=value` label filters identifying resources created by this tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    filters: Vec<String>,
}

impl LabelSelector {
    /// One filter per label
    pub fn from_labels(labels: &BTreeMap<String, String>) -> Self {
        Self {
            filters: labels.iter().map(|(k, v)| format!("{k}={v}")).collect(),
        }
    }

    /// Filters in `key=value` form
    pub fn filters(&self) -> &[String] {
        &self.filters
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filters.join(","))
    }
}

/// Prepares the network set for a run
pub struct NetworkProvisioner {
    runtime: Arc<dyn ContainerRuntime>,
    prefix: String,
    labels: BTreeMap<String, String>,
}

impl NetworkProvisioner {
    /// Provisioner using the naming and labels from `config`
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: &BurnConfig) -> Self {
        Self {
            runtime,
            prefix: config.network_prefix.clone(),
            labels: config.labels.clone(),
        }
    }

    /// Selector matching networks this tool created
    pub fn selector(&self) -> LabelSelector {
        LabelSelector::from_labels(&self.labels)
    }

    /// Remove leftover labeled networks, returning how many were removed
    pub async fn prune(&self) -> BurnResult<usize> {
        let selector = self.selector();
        let removed = self
            .runtime
            .prune_networks(&selector)
            .await
            .map_err(BurnError::PruneNetworks)?;

        tracing::info!(selector = %selector, removed, "Pruned labeled networks");
        Ok(removed)
    }

    /// Prune, then create `count` networks named `<prefix>-0..count`
    ///
    /// Any failure aborts provisioning; there is no partial result.
    pub async fn provision(&self, count: usize) -> BurnResult<NetworkSet> {
        if count == 0 {
            return Err(BurnError::config("network count must be at least 1"));
        }

        self.prune().await?;

        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let name = format!("{}-{}", self.prefix, i);
            let id = self
                .runtime
                .create_network(&name, &self.labels)
                .await
                .map_err(|source| BurnError::CreateNetwork {
                    name: name.clone(),
                    source,
                })?;

            tracing::debug!(network = %name, id = %id, "Created network");
            ids.push(id);
        }

        tracing::info!(count, prefix = %self.prefix, "Provisioned networks");
        NetworkSet::new(ids)
    }
}

impl fmt::Debug for NetworkProvisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkProvisioner")
            .field("runtime", &self.runtime.runtime_name())
            .field("prefix", &self.prefix)
            .field("labels", &self.labels)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRuntime;

    fn labels() -> BTreeMap<String, String> {
        BurnConfig::default().labels
    }

    #[test]
    fn test_network_set_round_robin() {
        let set = NetworkSet::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let picked: Vec<&str> = (0..7).map(|i| set.for_index(WorkIndex(i))).collect();
        assert_eq!(picked, vec!["a", "b", "c", "a", "b", "c", "a"]);
        assert_eq!(set.for_index(WorkIndex(u64::MAX)), "a");
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_network_set_rejects_empty() {
        assert!(NetworkSet::new(Vec::new()).is_err());
    }

    #[test]
    fn test_label_selector_filters() {
        let mut labels = labels();
        labels.insert("owner".into(), "ci".into());
        let selector = LabelSelector::from_labels(&labels);
        assert_eq!(selector.filters(), ["containerburn=true", "owner=ci"]);
        assert_eq!(selector.to_string(), "containerburn=true,owner=ci");
    }

    #[tokio::test]
    async fn test_provision_creates_named_labeled_networks() {
        let runtime = Arc::new(MockRuntime::new());
        let provisioner = NetworkProvisioner::new(runtime.clone(), &BurnConfig::default());

        let set = provisioner.provision(3).await.unwrap();

        assert_eq!(set.len(), 3);
        let networks = runtime.networks();
        let names: Vec<&str> = networks.values().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["containerburn-0", "containerburn-1", "containerburn-2"]);
        assert!(networks.values().all(|n| n.labels == labels()));
        for id in set.ids() {
            assert!(networks.contains_key(id));
        }
    }

    #[tokio::test]
    async fn test_provision_twice_replaces_networks() {
        let runtime = Arc::new(MockRuntime::new());
        let provisioner = NetworkProvisioner::new(runtime.clone(), &BurnConfig::default());

        let first = provisioner.provision(3).await.unwrap();
        assert_eq!(runtime.labeled_network_count(&labels()), 3);

        let second = provisioner.provision(3).await.unwrap();
        assert_eq!(runtime.labeled_network_count(&labels()), 3);
        assert_eq!(runtime.pruned_counts(), vec![0, 3]);

        for id in first.ids() {
            assert!(!second.ids().contains(id), "network id {id} was reused");
        }
    }

    #[tokio::test]
    async fn test_prune_leaves_unlabeled_networks() {
        let runtime = Arc::new(MockRuntime::new());
        runtime.seed_network("bridge", BTreeMap::new());
        let provisioner = NetworkProvisioner::new(runtime.clone(), &BurnConfig::default());

        provisioner.provision(2).await.unwrap();
        provisioner.provision(2).await.unwrap();

        assert_eq!(runtime.networks().len(), 3);
    }

    #[tokio::test]
    async fn test_prune_failure_is_fatal() {
        let runtime = Arc::new(MockRuntime::new().fail_prune());
        let provisioner = NetworkProvisioner::new(runtime.clone(), &BurnConfig::default());

        let err = provisioner.provision(3).await.unwrap_err();
        assert!(matches!(err, BurnError::PruneNetworks(_)));
        assert!(runtime.networks().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_fatal() {
        let runtime = Arc::new(MockRuntime::new().fail_network_create("containerburn-1"));
        let provisioner = NetworkProvisioner::new(runtime.clone(), &BurnConfig::default());

        let err = provisioner.provision(3).await.unwrap_err();
        match err {
            BurnError::CreateNetwork { name, .. } => assert_eq!(name, "containerburn-1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_provision_zero_rejected() {
        let runtime = Arc::new(MockRuntime::new());
        let provisioner = NetworkProvisioner::new(runtime, &BurnConfig::default());
        assert!(matches!(
            provisioner.provision(0).await,
            Err(BurnError::Config(_))
        ));
    }
}
