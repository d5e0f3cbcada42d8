// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Registry-backed service discovery: the local instance cache, the own-registration
//! register/renew/cancel lifecycle, and the background node-list refresh.

mod registry;
mod types;

pub use registry::{CancelHandle, Registry, RegistryConfig, NODE_INTERVAL, RENEW_INTERVAL};
pub use types::{ServiceInstance, STATUS_UP};
