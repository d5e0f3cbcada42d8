// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Picks one address per call from a slice fixed at construction time. Implementations must be
/// safe to call concurrently.
pub trait LoadBalancer: Send + Sync {
    fn get(&self) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalanceMode {
    RoundRobin,
}

/// Builds the load balancer named by `mode` over a fixed address set.
pub fn build_load_balancer(mode: LoadBalanceMode, addresses: Vec<String>) -> Arc<dyn LoadBalancer> {
    match mode {
        LoadBalanceMode::RoundRobin => Arc::new(RoundRobin::new(addresses)),
    }
}

pub struct RoundRobin {
    addresses: Vec<String>,
    idx: AtomicUsize,
}

impl RoundRobin {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            idx: AtomicUsize::new(0),
        }
    }
}

impl LoadBalancer for RoundRobin {
    fn get(&self) -> Option<String> {
        if self.addresses.is_empty() {
            return None;
        }

        let i = self.idx.fetch_add(1, Ordering::Relaxed) % self.addresses.len();
        Some(self.addresses[i].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn round_robin_fairness() {
        let addrs: Vec<String> = (0..4).map(|i| format!("addr-{i}")).collect();
        let lb = RoundRobin::new(addrs.clone());

        let k = 10;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..(k * addrs.len()) {
            *counts.entry(lb.get().unwrap()).or_default() += 1;
        }

        for addr in &addrs {
            assert_eq!(counts[addr], k);
        }
    }

    #[test]
    fn empty_address_set_returns_none() {
        let lb = RoundRobin::new(vec![]);
        assert!(lb.get().is_none());
    }
}
