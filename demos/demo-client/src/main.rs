// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use clap::Parser;
use log::*;

use rpc_core::client::{ClientOption, ClientProxy, FailMode};
use rpc_core::discovery::{Registry, RegistryConfig};
use rpc_core::protocol::Value;

#[derive(Debug, Parser)]
struct Cli {
    #[arg(long, default_value = "UserService")]
    appid: String,

    #[arg(long, default_value = "dev")]
    env: String,

    /// Registry node, e.g. "127.0.0.1:9000". Repeat to list several.
    #[arg(long = "registry-node", required = true)]
    registry_nodes: Vec<String>,

    #[arg(long, default_value_t = 2)]
    user_id: i64,

    #[arg(long, value_enum, default_value = "failover")]
    fail_mode: FailModeArg,
}

#[derive(Debug, Clone, clap::ValueEnum)]
enum FailModeArg {
    Failfast,
    Failretry,
    Failover,
}

impl From<FailModeArg> for FailMode {
    fn from(value: FailModeArg) -> Self {
        match value {
            FailModeArg::Failfast => FailMode::Failfast,
            FailModeArg::Failretry => FailMode::Failretry,
            FailModeArg::Failover => FailMode::Failover,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    let registry = Registry::new(RegistryConfig {
        nodes: args.registry_nodes,
        env: args.env,
    });

    let mut option = ClientOption::default();
    option.fail_mode = args.fail_mode.into();

    let proxy = ClientProxy::new(args.appid, option, &registry);

    match proxy.call("User.GetUserByID", &[Value::I64(args.user_id)]) {
        Ok(results) => info!("GetUserByID({}) -> {results:?}", args.user_id),
        Err(e) => error!("GetUserByID({}) failed: {e}", args.user_id),
    }

    registry.stop_background_tasks();
}
