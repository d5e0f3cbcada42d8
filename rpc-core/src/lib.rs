// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A small RPC framework: wire protocol, server dispatch, registry-backed
//! service discovery, and a client proxy with load balancing and fault
//! tolerance.

pub mod client;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod server;
pub mod testutil;

pub use error::Error;
