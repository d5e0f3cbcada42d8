// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::*;

use crate::discovery::types::{
    Envelope, FetchRequest, InstancesData, NodesRequest, RegisterRequest, RenewOrCancelRequest,
    ServiceInstance, STATUS_UP,
};
use crate::error::{Error, RegistryError};

/// How often the node-refresh loop polls `/api/nodes` for the current registry endpoint list.
pub const NODE_INTERVAL: Duration = Duration::from_secs(90);

/// How often an own-registration's renew loop POSTs `/api/renew`.
pub const RENEW_INTERVAL: Duration = Duration::from_secs(60);

const SLEEP_TICK: Duration = Duration::from_millis(200);

struct CacheEntry {
    instances: Vec<ServiceInstance>,
}

/// Static configuration the `Registry` was constructed with: the initial set of registry node
/// addresses, and the environment tag sent on every call.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub nodes: Vec<String>,
    pub env: String,
}

/// Client for an external, HTTP/JSON registry service. Keeps a local instance cache, lets the
/// server side register/renew/cancel itself, and keeps its own list of registry node addresses
/// fresh in the background.
pub struct Registry {
    conf: RegistryConfig,
    apps_cache: Mutex<HashMap<String, CacheEntry>>,
    own_registrations: Mutex<HashSet<String>>,
    nodes: RwLock<Vec<String>>,
    idx: AtomicUsize,
    agent: ureq::Agent,
    node_refresh_stop: Arc<AtomicBool>,
    node_refresh_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    /// Builds a registry client and starts its background node-refresh loop.
    pub fn new(conf: RegistryConfig) -> Arc<Self> {
        let registry = Arc::new(Self {
            conf,
            apps_cache: Mutex::new(HashMap::new()),
            own_registrations: Mutex::new(HashSet::new()),
            nodes: RwLock::new(Vec::new()),
            idx: AtomicUsize::new(0),
            agent: ureq::Agent::new_with_defaults(),
            node_refresh_stop: Arc::new(AtomicBool::new(false)),
            node_refresh_thread: Mutex::new(None),
        });

        let loop_registry = registry.clone();
        let stop = registry.node_refresh_stop.clone();
        let handle = thread::spawn(move || loop_registry.node_refresh_loop(stop));
        *registry.node_refresh_thread.lock().unwrap() = Some(handle);

        registry
    }

    /// Stops the background node-refresh loop. Call before dropping the last `Arc` if a clean
    /// shutdown is needed; otherwise the thread runs until the process exits.
    pub fn stop_background_tasks(&self) {
        self.node_refresh_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.node_refresh_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Returns the registry node to contact next: `nodes[idx mod len]`, falling back to the
    /// statically configured node list if the refreshed list is empty or hasn't been populated
    /// yet.
    pub fn pick_node(&self) -> String {
        let nodes = self.nodes.read().unwrap();
        let candidates: &[String] = if nodes.is_empty() {
            &self.conf.nodes
        } else {
            &nodes
        };

        let idx = self.idx.load(Ordering::Relaxed) % candidates.len().max(1);
        candidates
            .get(idx)
            .cloned()
            .unwrap_or_else(|| self.conf.nodes[0].clone())
    }

    /// Rotates to the next registry node. Called on any request failure against the current
    /// node — the only side effect a registry-call failure has on shared state.
    pub fn switch_node(&self) {
        self.idx.fetch_add(1, Ordering::Relaxed);
    }

    fn node_refresh_loop(&self, stop: Arc<AtomicBool>) {
        loop {
            if sleep_or_stop(&stop, NODE_INTERVAL) {
                return;
            }

            match self.fetch_nodes() {
                Ok(addresses) => self.replace_nodes_if_changed(addresses),
                Err(e) => {
                    warn!("node refresh failed: {e}");
                    self.switch_node();
                }
            }
        }
    }

    fn fetch_nodes(&self) -> Result<Vec<String>, RegistryError> {
        let node = self.pick_node();
        let body = NodesRequest { env: &self.conf.env };
        let envelope: Envelope<InstancesData> =
            post_json(&self.agent, &node, "/api/nodes", &body)?;

        if envelope.code != 200 {
            return Err(RegistryError::NonSuccess {
                code: envelope.code,
                message: "nodes".into(),
            });
        }

        let data = envelope.data.unwrap_or(InstancesData {
            instances: Vec::new(),
            latest_timestamp: 0,
        });

        Ok(data
            .instances
            .into_iter()
            .flat_map(|inst| inst.addresses)
            .map(|addr| addr.strip_prefix("http://").unwrap_or(&addr).to_string())
            .collect())
    }

    fn replace_nodes_if_changed(&self, mut addresses: Vec<String>) {
        addresses.sort();
        addresses.dedup();

        let mut current = self.nodes.write().unwrap();
        let mut sorted_current = current.clone();
        sorted_current.sort();

        if sorted_current != addresses {
            info!("registry node list changed: {addresses:?}");
            *current = addresses;
        }
    }

    /// Registers `instance` with the registry and starts a renew loop that keeps it alive.
    /// Rejects a second registration for an appid that's already registered from this process.
    pub fn register(self: &Arc<Self>, instance: ServiceInstance) -> Result<CancelHandle, Error> {
        {
            let mut registered = self.own_registrations.lock().unwrap();
            if registered.contains(&instance.appid) {
                return Err(
                    crate::error::LifecycleError::DuplicateRegistration(instance.appid.clone())
                        .into(),
                );
            }
            registered.insert(instance.appid.clone());
        }

        if let Err(e) = self.post_register(&instance) {
            self.switch_node();
            self.own_registrations.lock().unwrap().remove(&instance.appid);
            return Err(e.into());
        }

        info!("registered appid={} with registry", instance.appid);

        let stop = Arc::new(AtomicBool::new(false));
        let renew_instance = instance.clone();
        let renew_stop = stop.clone();
        let renew_registry = self.clone();
        let handle = thread::spawn(move || renew_registry.renew_loop(renew_instance, renew_stop));

        Ok(CancelHandle {
            registry: self.clone(),
            instance,
            stop,
            join: Mutex::new(Some(handle)),
        })
    }

    fn renew_loop(&self, instance: ServiceInstance, stop: Arc<AtomicBool>) {
        loop {
            if sleep_or_stop(&stop, RENEW_INTERVAL) {
                return;
            }

            if let Err(e) = self.post_renew(&instance) {
                warn!(
                    "renew failed for appid={}, re-registering: {e}",
                    instance.appid
                );
                if let Err(e) = self.post_register(&instance) {
                    warn!("re-registration after failed renew also failed: {e}");
                }
            }
        }
    }

    fn post_register(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let node = self.pick_node();
        let body = RegisterRequest {
            env: &instance.env,
            appid: &instance.appid,
            hostname: &instance.hostname,
            addresses: &instance.addresses,
            version: &instance.version,
            status: instance.status,
        };

        let envelope: Envelope<serde_json::Value> =
            post_json(&self.agent, &node, "/api/register", &body)?;

        if envelope.code != 200 {
            return Err(RegistryError::NonSuccess {
                code: envelope.code,
                message: "register".into(),
            });
        }

        Ok(())
    }

    fn post_renew(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let node = self.pick_node();
        let body = RenewOrCancelRequest {
            env: &instance.env,
            appid: &instance.appid,
            hostname: &instance.hostname,
        };

        let envelope: Envelope<serde_json::Value> =
            post_json(&self.agent, &node, "/api/renew", &body)?;

        if envelope.code != 200 {
            return Err(RegistryError::NonSuccess {
                code: envelope.code,
                message: "renew".into(),
            });
        }

        Ok(())
    }

    fn post_cancel(&self, instance: &ServiceInstance) {
        let node = self.pick_node();
        let body = RenewOrCancelRequest {
            env: &instance.env,
            appid: &instance.appid,
            hostname: &instance.hostname,
        };

        let result: Result<Envelope<serde_json::Value>, RegistryError> =
            post_json(&self.agent, &node, "/api/cancel", &body);

        if let Err(e) = result {
            warn!("best-effort cancel failed for appid={}: {e}", instance.appid);
        }
    }

    /// Returns the cached instance list for `appid` if present, otherwise fetches it from the
    /// registry. A successful fetch that returns no instances is never cached, and a cache hit
    /// never makes a network call.
    pub fn fetch(&self, appid: &str) -> (Vec<ServiceInstance>, bool) {
        if let Some(entry) = self.apps_cache.lock().unwrap().get(appid) {
            return (entry.instances.clone(), true);
        }

        let node = self.pick_node();
        let body = FetchRequest {
            env: &self.conf.env,
            appid,
            status: STATUS_UP,
        };

        let envelope: Result<Envelope<InstancesData>, RegistryError> =
            post_json(&self.agent, &node, "/api/fetch", &body);

        let envelope = match envelope {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!("fetch transport failure for appid={appid}: {e}");
                self.switch_node();
                return (Vec::new(), false);
            }
        };

        if envelope.code != 200 {
            debug!("fetch for appid={appid} returned code {}", envelope.code);
            return (Vec::new(), false);
        }

        let instances = envelope
            .data
            .map(|d| d.instances)
            .unwrap_or_default();

        if instances.is_empty() {
            return (Vec::new(), false);
        }

        self.apps_cache.lock().unwrap().insert(
            appid.to_string(),
            CacheEntry {
                instances: instances.clone(),
            },
        );

        (instances, true)
    }
}

/// Handle returned by `Registry::register`. Dropping it does *not* cancel the registration —
/// call `cancel` explicitly, mirroring the fact that a live registration should outlive
/// accidental handle drops during refactors.
pub struct CancelHandle {
    registry: Arc<Registry>,
    instance: ServiceInstance,
    stop: Arc<AtomicBool>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl CancelHandle {
    /// Stops the renew loop, issues a best-effort `/api/cancel`, and removes the appid from the
    /// set of active self-registrations.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.join.lock().unwrap().take() {
            let _ = handle.join();
        }

        self.registry.post_cancel(&self.instance);
        self.registry
            .own_registrations
            .lock()
            .unwrap()
            .remove(&self.instance.appid);

        info!("cancelled registration for appid={}", self.instance.appid);
    }
}

fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
    agent: &ureq::Agent,
    node: &str,
    path: &str,
    body: &B,
) -> Result<T, RegistryError> {
    let url = format!("http://{node}{path}");
    let response = agent
        .post(&url)
        .send_json(body)
        .map_err(|e| RegistryError::Transport(e.to_string()))?;

    response
        .into_body()
        .read_json::<T>()
        .map_err(|e| RegistryError::Transport(e.to_string()))
}

/// Sleeps for up to `duration` in small increments, returning early (with `true`) if `stop` is
/// set in the meantime.
fn sleep_or_stop(stop: &Arc<AtomicBool>, duration: Duration) -> bool {
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if stop.load(Ordering::SeqCst) {
            return true;
        }
        let tick = remaining.min(SLEEP_TICK);
        thread::sleep(tick);
        remaining -= tick;
    }

    stop.load(Ordering::SeqCst)
}
