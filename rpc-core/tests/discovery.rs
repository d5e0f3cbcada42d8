// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Exercises the registry client's HTTP surface against an in-process HTTP stub, since the
//! registry backend itself is out of scope for this crate.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rpc_core::discovery::{Registry, RegistryConfig};

/// A minimal HTTP/1.1 server that always answers `/api/fetch` with a fixed instance list,
/// counting how many requests it has handled so tests can assert on cache behavior.
struct FetchStub {
    addr: String,
    hits: Arc<AtomicUsize>,
}

fn start_fetch_stub(body: &'static str) -> FetchStub {
    let _ = env_logger::try_init();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let hits = Arc::new(AtomicUsize::new(0));
    let thread_hits = hits.clone();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            thread_hits.fetch_add(1, Ordering::SeqCst);
            handle_one(&mut stream, body);
        }
    });

    FetchStub { addr, hits }
}

fn handle_one(stream: &mut TcpStream, body: &str) {
    let mut buf = [0u8; 4096];
    let _ = stream.read(&mut buf);

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

#[test]
fn fetch_caches_and_does_not_refetch_on_second_call() {
    let body = r#"{"code":200,"message":"ok","data":{"instances":[{"env":"dev","appid":"UserService","hostname":"h1","addresses":["tcp://127.0.0.1:9001"],"version":"1","status":1}],"latest_timestamp":0}}"#;
    let stub = start_fetch_stub(body);

    let registry = Registry::new(RegistryConfig {
        nodes: vec![stub.addr.clone()],
        env: "dev".to_string(),
    });

    let (first, found) = registry.fetch("UserService");
    assert!(found);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].dial_addresses(), vec!["127.0.0.1:9001"]);

    let (second, found_again) = registry.fetch("UserService");
    assert!(found_again);
    assert_eq!(second, first);

    assert_eq!(stub.hits.load(Ordering::SeqCst), 1);

    registry.stop_background_tasks();
}

#[test]
fn fetch_with_no_instances_is_not_cached_and_reports_not_found() {
    let body = r#"{"code":200,"message":"ok","data":{"instances":[],"latest_timestamp":0}}"#;
    let stub = start_fetch_stub(body);

    let registry = Registry::new(RegistryConfig {
        nodes: vec![stub.addr.clone()],
        env: "dev".to_string(),
    });

    let (instances, found) = registry.fetch("MissingService");
    assert!(!found);
    assert!(instances.is_empty());

    registry.stop_background_tasks();
}

#[test]
fn duplicate_self_registration_is_rejected() {
    let body = r#"{"code":200,"message":"ok","data":null}"#;
    let stub = start_fetch_stub(body);

    let registry = Registry::new(RegistryConfig {
        nodes: vec![stub.addr.clone()],
        env: "dev".to_string(),
    });

    let instance = rpc_core::discovery::ServiceInstance {
        env: "dev".to_string(),
        appid: "UserService".to_string(),
        hostname: "h1".to_string(),
        addresses: vec!["tcp://127.0.0.1:9001".to_string()],
        version: "1".to_string(),
        status: rpc_core::discovery::STATUS_UP,
    };

    let first = registry.register(instance.clone());
    assert!(first.is_ok());

    let second = registry.register(instance);
    assert!(second.is_err());

    first.unwrap().cancel();
    registry.stop_background_tasks();
}
