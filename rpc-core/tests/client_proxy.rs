// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::io::{Read, Write};
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::thread;

use rpc_core::client::{ClientOption, ClientProxy, FailMode};
use rpc_core::discovery::{Registry, RegistryConfig};
use rpc_core::protocol::Value;
use rpc_core::server::{HandlerRegistry, Listener, MethodTable};

fn start_registry_stub(server_addr: std::net::SocketAddr) -> String {
    let _ = env_logger::try_init();
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let stub_addr = listener.local_addr().unwrap().to_string();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);

            let body = format!(
                r#"{{"code":200,"message":"ok","data":{{"instances":[{{"env":"dev","appid":"UserService","hostname":"h1","addresses":["tcp://{server_addr}"],"version":"1","status":1}}],"latest_timestamp":0}}}}"#
            );
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    stub_addr
}

fn spawn_user_listener() -> Listener {
    let table = MethodTable::new().method("GetUserByID", |args| {
        rpc_core::server::expect_arity(&args, 1)?;
        Ok(args)
    });

    let mut handlers = HandlerRegistry::new();
    handlers.register("User", Arc::new(table));
    Listener::bind("127.0.0.1:0", Arc::new(handlers)).unwrap()
}

#[test]
fn proxy_failfast_round_trips_a_call() {
    let listener = spawn_user_listener();
    let stub_addr = start_registry_stub(listener.local_addr());

    let registry = Registry::new(RegistryConfig {
        nodes: vec![stub_addr],
        env: "dev".to_string(),
    });

    let mut option = ClientOption::default();
    option.fail_mode = FailMode::Failfast;
    let proxy = ClientProxy::new("UserService", option, &registry);

    let results = proxy.call("User.GetUserByID", &[Value::I64(4)]).unwrap();
    assert_eq!(results, vec![Value::I64(4)]);

    listener.shutdown();
    registry.stop_background_tasks();
}

#[test]
fn proxy_failover_retries_then_surfaces_unknown_method() {
    let listener = spawn_user_listener();
    let stub_addr = start_registry_stub(listener.local_addr());

    let registry = Registry::new(RegistryConfig {
        nodes: vec![stub_addr],
        env: "dev".to_string(),
    });

    let mut option = ClientOption::default();
    option.fail_mode = FailMode::Failover;
    option.retries = 2;
    let proxy = ClientProxy::new("UserService", option, &registry);

    let err = proxy.call("User.NoSuchMethod", &[]).unwrap_err();
    assert!(err.to_string().contains("NoSuchMethod"));

    listener.shutdown();
    registry.stop_background_tasks();
}

#[test]
#[should_panic(expected = "bootstrap discovery failed")]
fn proxy_construction_panics_when_bootstrap_fetch_is_empty() {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let stub_addr = listener.local_addr().unwrap().to_string();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            let body = r#"{"code":200,"message":"ok","data":{"instances":[],"latest_timestamp":0}}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    let registry = Registry::new(RegistryConfig {
        nodes: vec![stub_addr],
        env: "dev".to_string(),
    });

    let _proxy = ClientProxy::new("NoSuchApp", ClientOption::default(), &registry);
}
