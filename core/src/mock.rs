//! In-process container runtime used by the unit tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};

use crate::network::LabelSelector;
use crate::traits::{ContainerExit, ContainerRuntime, PullProgress, PullStream, RuntimeError};
use crate::workload::ContainerSpec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockNetwork {
    pub name: String,
    pub labels: BTreeMap<String, String>,
}

/// Records every call and lets tests inject failures by workload name
pub(crate) struct MockRuntime {
    wait_delay: Duration,
    pull_delay: Duration,
    fail_prune: bool,
    fail_pull: bool,
    fail_network_create: Option<String>,
    fail_create: HashSet<String>,
    fail_start: HashSet<String>,
    fail_wait: HashSet<String>,
    exits: HashMap<String, ContainerExit>,

    next_id: AtomicUsize,
    networks: Mutex<BTreeMap<String, MockNetwork>>,
    pruned: Mutex<Vec<usize>>,
    containers: Mutex<HashMap<String, ContainerSpec>>,
    created: Mutex<Vec<ContainerSpec>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            wait_delay: Duration::from_millis(5),
            pull_delay: Duration::ZERO,
            fail_prune: false,
            fail_pull: false,
            fail_network_create: None,
            fail_create: HashSet::new(),
            fail_start: HashSet::new(),
            fail_wait: HashSet::new(),
            exits: HashMap::new(),
            next_id: AtomicUsize::new(0),
            networks: Mutex::new(BTreeMap::new()),
            pruned: Mutex::new(Vec::new()),
            containers: Mutex::new(HashMap::new()),
            created: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = delay;
        self
    }

    pub fn with_pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = delay;
        self
    }

    pub fn fail_prune(mut self) -> Self {
        self.fail_prune = true;
        self
    }

    pub fn fail_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    pub fn fail_network_create(mut self, name: &str) -> Self {
        self.fail_network_create = Some(name.to_string());
        self
    }

    pub fn fail_create(mut self, name: &str) -> Self {
        self.fail_create.insert(name.to_string());
        self
    }

    pub fn fail_start(mut self, name: &str) -> Self {
        self.fail_start.insert(name.to_string());
        self
    }

    pub fn fail_wait(mut self, name: &str) -> Self {
        self.fail_wait.insert(name.to_string());
        self
    }

    pub fn exit_with(mut self, name: &str, exit: ContainerExit) -> Self {
        self.exits.insert(name.to_string(), exit);
        self
    }

    pub fn seed_network(&self, name: &str, labels: BTreeMap<String, String>) -> String {
        let id = self.new_id("net");
        self.networks.lock().unwrap().insert(
            id.clone(),
            MockNetwork {
                name: name.to_string(),
                labels,
            },
        );
        id
    }

    pub fn networks(&self) -> BTreeMap<String, MockNetwork> {
        self.networks.lock().unwrap().clone()
    }

    pub fn labeled_network_count(&self, labels: &BTreeMap<String, String>) -> usize {
        self.networks
            .lock()
            .unwrap()
            .values()
            .filter(|n| &n.labels == labels)
            .count()
    }

    pub fn pruned_counts(&self) -> Vec<usize> {
        self.pruned.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_names(&self) -> Vec<String> {
        self.created().into_iter().map(|c| c.name).collect()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn new_id(&self, kind: &str) -> String {
        // Zero-padded so BTreeMap order matches creation order.
        format!("{kind}-{:06}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn name_of(&self, id: &str) -> Result<String, RuntimeError> {
        self.containers
            .lock()
            .unwrap()
            .get(id)
            .map(|c| c.name.clone())
            .ok_or_else(|| RuntimeError::Api {
                status: 404,
                message: format!("no such container: {id}"),
            })
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    fn runtime_name(&self) -> &str {
        "mock"
    }

    fn pull_image<'a>(&'a self, image: &'a str) -> PullStream<'a> {
        self.record_call();
        let items = if self.fail_pull {
            vec![Err(RuntimeError::Api {
                status: 404,
                message: format!("manifest for {image} not found"),
            })]
        } else {
            vec![
                Ok(PullProgress {
                    id: Some("latest".into()),
                    status: Some("Pulling from library/alpine".into()),
                    progress: None,
                }),
                Ok(PullProgress {
                    id: None,
                    status: Some(format!("Status: Image is up to date for {image}")),
                    progress: None,
                }),
            ]
        };
        let delay = self.pull_delay;
        let stall = stream::once(tokio::time::sleep(delay))
            .filter_map(|()| async { None::<Result<PullProgress, RuntimeError>> });
        Box::pin(stall.chain(stream::iter(items)))
    }

    async fn prune_networks(&self, selector: &LabelSelector) -> Result<usize, RuntimeError> {
        self.record_call();
        if self.fail_prune {
            return Err(RuntimeError::Connection("daemon unreachable".into()));
        }

        let mut networks = self.networks.lock().unwrap();
        let before = networks.len();
        networks.retain(|_, n| {
            let matches = selector.filters().iter().all(|f| {
                f.split_once('=')
                    .is_some_and(|(k, v)| n.labels.get(k).map(String::as_str) == Some(v))
            });
            !matches
        });
        let removed = before - networks.len();
        self.pruned.lock().unwrap().push(removed);
        Ok(removed)
    }

    async fn create_network(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<String, RuntimeError> {
        self.record_call();
        if self.fail_network_create.as_deref() == Some(name) {
            return Err(RuntimeError::Api {
                status: 409,
                message: format!("network {name} conflicts"),
            });
        }
        Ok(self.seed_network(name, labels.clone()))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.record_call();
        if self.fail_create.contains(&spec.name) {
            return Err(RuntimeError::Api {
                status: 500,
                message: format!("cannot create {}", spec.name),
            });
        }

        let id = self.new_id("ctr");
        self.containers
            .lock()
            .unwrap()
            .insert(id.clone(), spec.clone());
        self.created.lock().unwrap().push(spec.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record_call();
        let name = self.name_of(id)?;
        if self.fail_start.contains(&name) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(RuntimeError::Api {
                status: 500,
                message: format!("cannot start {name}"),
            });
        }
        Ok(())
    }

    async fn wait_for_removal(&self, id: &str) -> Result<ContainerExit, RuntimeError> {
        self.record_call();
        let _guard = InFlightGuard(&self.in_flight);
        let name = self.name_of(id)?;

        tokio::time::sleep(self.wait_delay).await;

        if self.fail_wait.contains(&name) {
            return Err(RuntimeError::Stream(format!("lost removal event for {name}")));
        }
        Ok(self
            .exits
            .get(&name)
            .cloned()
            .unwrap_or_else(|| ContainerExit::code(0)))
    }
}
