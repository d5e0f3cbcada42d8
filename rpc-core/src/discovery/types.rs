// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use serde::{Deserialize, Serialize};

/// A live server process registered under an appid, exposing one or more transport-qualified
/// addresses such as `"tcp://host:port"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub env: String,
    pub appid: String,
    pub hostname: String,
    pub addresses: Vec<String>,
    pub version: String,
    pub status: i32,
}

impl ServiceInstance {
    /// Addresses with their `tcp://` scheme stripped, ready to pass to `TcpStream::connect`.
    pub fn dial_addresses(&self) -> Vec<String> {
        self.addresses
            .iter()
            .map(|a| a.strip_prefix("tcp://").unwrap_or(a).to_string())
            .collect()
    }
}

/// Status value used by `Fetch` to request only healthy instances.
pub const STATUS_UP: i32 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub env: &'a str,
    pub appid: &'a str,
    pub hostname: &'a str,
    pub addresses: &'a [String],
    pub version: &'a str,
    pub status: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenewOrCancelRequest<'a> {
    pub env: &'a str,
    pub appid: &'a str,
    pub hostname: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct FetchRequest<'a> {
    pub env: &'a str,
    pub appid: &'a str,
    pub status: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct NodesRequest<'a> {
    pub env: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: u32,
    #[allow(dead_code)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InstancesData {
    pub instances: Vec<ServiceInstance>,
    #[allow(dead_code)]
    #[serde(default)]
    pub latest_timestamp: i64,
}
