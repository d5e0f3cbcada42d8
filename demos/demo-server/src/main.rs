// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::collections::BTreeMap;
use std::sync::Arc;

use clap::Parser;
use log::*;

use rpc_core::discovery::{Registry, RegistryConfig};
use rpc_core::error::DispatchError;
use rpc_core::protocol::Value;
use rpc_core::server::{MethodTable, Server, ServerOption};

#[derive(Debug, Parser)]
struct Cli {
    #[arg(long, default_value = "0.0.0.0")]
    ip: String,

    #[arg(long, default_value_t = 0)]
    port: u16,

    #[arg(long, default_value = "localhost")]
    hostname: String,

    #[arg(long, default_value = "UserService")]
    appid: String,

    #[arg(long, default_value = "dev")]
    env: String,

    /// Registry node, e.g. "127.0.0.1:9000". Repeat to list several.
    #[arg(long = "registry-node", required = true)]
    registry_nodes: Vec<String>,
}

fn user_service() -> Arc<dyn rpc_core::server::Service> {
    let table = MethodTable::new().method("GetUserByID", |args| {
        rpc_core::server::expect_arity(&args, 1)?;

        let Value::I64(id) = args[0] else {
            return Err(DispatchError::Handler("ID must be an integer".into()));
        };

        let mut user = BTreeMap::new();
        user.insert("ID".to_string(), Value::I64(id));
        user.insert("Name".to_string(), Value::Str("BBB".into()));
        user.insert("Age".to_string(), Value::I64(12));

        Ok(vec![Value::Map(user)])
    });

    Arc::new(table)
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    let registry = Registry::new(RegistryConfig {
        nodes: args.registry_nodes,
        env: args.env.clone(),
    });

    let option = ServerOption {
        ip: args.ip,
        port: args.port,
        hostname: args.hostname,
        appid: args.appid,
        env: args.env,
        ..ServerOption::default()
    };

    let mut server = Server::new(option, registry);
    server.register_name("User", user_service());

    if let Err(e) = server.run() {
        error!("failed to start server: {e}");
        std::process::exit(1);
    }

    info!("demo-server running, type a line on stdin (or send EOF) to stop");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    server.shutdown();
}
