// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! End-to-end exercises against a real `Listener` over TCP: happy path, dispatch errors that
//! stay on the wire instead of tearing the connection down, and framing attacks that don't.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use rpc_core::protocol::{
    codec_for, unwrap_response, SerializeType, Value, WireMessage, MAGIC,
};
use rpc_core::server::{HandlerRegistry, Listener, MethodTable};

fn user_service() -> Arc<dyn rpc_core::server::Service> {
    let table = MethodTable::new().method("GetUserByID", |args| {
        rpc_core::server::expect_arity(&args, 1)?;
        let Value::I64(id) = args[0] else {
            return Err(rpc_core::error::DispatchError::Handler(
                "expected an integer id".into(),
            ));
        };

        let mut user = std::collections::BTreeMap::new();
        user.insert("ID".to_string(), Value::I64(id));
        user.insert("Name".to_string(), Value::Str("BBB".into()));
        user.insert("Age".to_string(), Value::I64(12));

        Ok(vec![Value::Map(user)])
    });

    Arc::new(table)
}

fn spawn_listener() -> Listener {
    let _ = env_logger::try_init();
    let mut handlers = HandlerRegistry::new();
    handlers.register("User", user_service());
    Listener::bind("127.0.0.1:0", Arc::new(handlers)).unwrap()
}

fn call(
    stream: &mut TcpStream,
    class: &str,
    method: &str,
    params: &[Value],
) -> Result<Vec<Value>, String> {
    let codec = codec_for(SerializeType::Binary);
    let mut request = WireMessage::new_request(SerializeType::Binary);
    request.service_class = class.into();
    request.service_method = method.into();
    request.payload = codec.encode(params).unwrap();
    request.send(stream).unwrap();

    let response = WireMessage::read(stream).unwrap();
    let values = codec.decode(&response.payload).unwrap();
    unwrap_response(values)
}

#[test]
fn happy_path_end_to_end() {
    let listener = spawn_listener();
    let mut stream = TcpStream::connect(listener.local_addr()).unwrap();

    let results = call(&mut stream, "User", "GetUserByID", &[Value::I64(2)]).unwrap();
    let Value::Map(user) = &results[0] else {
        panic!("expected a map result");
    };
    assert_eq!(user["ID"], Value::I64(2));
    assert_eq!(user["Name"], Value::Str("BBB".into()));
    assert_eq!(user["Age"], Value::I64(12));

    listener.shutdown();
}

#[test]
fn unknown_method_returns_structured_error_without_closing_connection() {
    let listener = spawn_listener();
    let mut stream = TcpStream::connect(listener.local_addr()).unwrap();

    let err = call(&mut stream, "User", "Missing", &[]).unwrap_err();
    assert!(err.contains("Missing"));

    // the connection must still be usable for a subsequent call
    let results = call(&mut stream, "User", "GetUserByID", &[Value::I64(9)]).unwrap();
    assert!(!results.is_empty());

    listener.shutdown();
}

#[test]
fn unknown_class_returns_structured_error() {
    let listener = spawn_listener();
    let mut stream = TcpStream::connect(listener.local_addr()).unwrap();

    let err = call(&mut stream, "NoSuchClass", "Anything", &[]).unwrap_err();
    assert!(err.contains("NoSuchClass"));

    listener.shutdown();
}

#[test]
fn bad_magic_byte_closes_the_connection_without_dispatching() {
    let listener = spawn_listener();
    let mut stream = TcpStream::connect(listener.local_addr()).unwrap();

    let codec = codec_for(SerializeType::Binary);
    let mut request = WireMessage::new_request(SerializeType::Binary);
    request.service_class = "User".into();
    request.service_method = "GetUserByID".into();
    request.payload = codec.encode(&[Value::I64(1)]).unwrap();

    let mut buf = Vec::new();
    request.send(&mut buf).unwrap();
    buf[0] = !MAGIC;

    stream.write_all(&buf).unwrap();

    let mut byte = [0u8; 1];
    let read_result = stream.read(&mut byte);
    assert!(matches!(read_result, Ok(0) | Err(_)));

    listener.close();
}

#[test]
fn shutdown_drains_in_flight_call_before_returning() {
    let listener = spawn_listener();
    let mut stream = TcpStream::connect(listener.local_addr()).unwrap();

    let results = call(&mut stream, "User", "GetUserByID", &[Value::I64(5)]).unwrap();
    assert!(!results.is_empty());

    // by the time shutdown() returns, the accept thread and all handler threads have joined
    listener.shutdown();
}
