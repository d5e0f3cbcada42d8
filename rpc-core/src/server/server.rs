// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::sync::Arc;
use std::time::Duration;

use log::*;

use crate::discovery::{CancelHandle, Registry, ServiceInstance, STATUS_UP};
use crate::error::Error;
use crate::server::handler::{HandlerRegistry, Service};
use crate::server::listener::Listener;

/// Server-side configuration (spec.md §6's server option table).
#[derive(Debug, Clone)]
pub struct ServerOption {
    pub ip: String,
    pub port: u16,
    pub hostname: String,
    pub appid: String,
    pub env: String,
    pub net_protocol: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_register_retry: u32,
}

impl Default for ServerOption {
    fn default() -> Self {
        Self {
            ip: "0.0.0.0".to_string(),
            port: 0,
            hostname: "localhost".to_string(),
            appid: String::new(),
            env: "dev".to_string(),
            net_protocol: "tcp".to_string(),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            max_register_retry: 3,
        }
    }
}

/// Owns the listener, the set of registered service objects, and the registry registration
/// obtained for this process at `run` time.
pub struct Server {
    option: ServerOption,
    registry: Arc<Registry>,
    handlers: HandlerRegistry,
    listener: Option<Listener>,
    cancel_handle: Option<CancelHandle>,
}

impl Server {
    pub fn new(option: ServerOption, registry: Arc<Registry>) -> Self {
        Self {
            option,
            registry,
            handlers: HandlerRegistry::new(),
            listener: None,
            cancel_handle: None,
        }
    }

    /// Installs a handler under `name`. Must be called before `run`.
    pub fn register_name(&mut self, name: impl Into<String>, service: Arc<dyn Service>) {
        self.handlers.register(name, service);
    }

    /// Starts the listener, then registers this server with the registry (retrying up to
    /// `max_register_retry` times). On registration failure the listener is closed and the
    /// error is returned.
    pub fn run(&mut self) -> Result<(), Error> {
        let handlers = Arc::new(std::mem::take(&mut self.handlers));
        let listener = Listener::bind((self.option.ip.as_str(), self.option.port), handlers)?;

        info!(
            "server for appid={} listening on {}",
            self.option.appid,
            listener.local_addr()
        );

        let address = format!("{}://{}", self.option.net_protocol, listener.local_addr());
        let instance = ServiceInstance {
            env: self.option.env.clone(),
            appid: self.option.appid.clone(),
            hostname: self.option.hostname.clone(),
            addresses: vec![address],
            version: "1".to_string(),
            status: STATUS_UP,
        };

        match self.register_to_naming(instance) {
            Ok(cancel) => {
                self.cancel_handle = Some(cancel);
                self.listener = Some(listener);
                Ok(())
            }
            Err(e) => {
                warn!(
                    "failed to register appid={} with registry after {} attempts: {e}",
                    self.option.appid, self.option.max_register_retry
                );
                listener.close();
                Err(e)
            }
        }
    }

    fn register_to_naming(&self, instance: ServiceInstance) -> Result<CancelHandle, Error> {
        let mut last_err = None;

        for attempt in 1..=self.option.max_register_retry.max(1) {
            match self.registry.register(instance.clone()) {
                Ok(cancel) => return Ok(cancel),
                Err(e) => {
                    warn!(
                        "registration attempt {attempt}/{} failed: {e}",
                        self.option.max_register_retry
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.expect("at least one registration attempt is always made"))
    }

    /// Cancels the registry registration, then drains the listener (see `Listener::shutdown`).
    pub fn shutdown(&mut self) {
        if let Some(cancel) = self.cancel_handle.take() {
            cancel.cancel();
        }
        if let Some(listener) = self.listener.take() {
            listener.shutdown();
        }
    }

    /// Cancels the registry registration, then closes the listener without draining.
    pub fn close(&mut self) {
        if let Some(cancel) = self.cancel_handle.take() {
            cancel.cancel();
        }
        if let Some(listener) = self.listener.take() {
            listener.close();
        }
    }
}
