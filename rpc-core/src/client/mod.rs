// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Client-side invocation: a one-shot `Client`, load balancing, and the `ClientProxy` that ties
//! a bound appid, a registry-backed instance list, and a fail mode together.

pub mod balancer;
pub mod connection;
pub mod proxy;

pub use balancer::{build_load_balancer, LoadBalanceMode, LoadBalancer, RoundRobin};
pub use connection::{Client, ClientOption};
pub use proxy::{ClientProxy, FailMode};
