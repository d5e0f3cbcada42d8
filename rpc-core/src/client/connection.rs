// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::*;

use crate::error::Error;
use crate::protocol::{codec_for, CompressType, ServicePath, SerializeType, Value, WireMessage};
use crate::server::listener::decode_response;

/// Client-side configuration (spec.md §6's client option table).
#[derive(Debug, Clone)]
pub struct ClientOption {
    pub retries: u32,
    pub connection_timeout: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub serialize_type: SerializeType,
    pub compress_type: CompressType,
    pub net_protocol: String,
    pub fail_mode: super::proxy::FailMode,
    pub load_balance_mode: super::balancer::LoadBalanceMode,
}

impl Default for ClientOption {
    fn default() -> Self {
        Self {
            retries: 3,
            connection_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(3),
            serialize_type: SerializeType::Binary,
            compress_type: CompressType::None,
            net_protocol: "tcp".to_string(),
            fail_mode: super::proxy::FailMode::Failover,
            load_balance_mode: super::balancer::LoadBalanceMode::RoundRobin,
        }
    }
}

/// One-shot invocation over a single TCP connection: dial, send, read, decode.
pub struct Client {
    option: ClientOption,
}

impl Client {
    pub fn new(option: ClientOption) -> Self {
        Self { option }
    }

    /// Dials `addr` (a bare `host:port`, scheme already stripped by the caller) honoring
    /// `connection_timeout`, and applies the configured read/write timeouts to the resulting
    /// stream.
    pub fn connect(&self, addr: &str) -> Result<TcpStream, Error> {
        let socket_addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, addr.to_string()))?;

        let stream = TcpStream::connect_timeout(&socket_addr, self.option.connection_timeout)?;
        stream.set_read_timeout(Some(self.option.read_timeout))?;
        stream.set_write_timeout(Some(self.option.write_timeout))?;

        Ok(stream)
    }

    /// Encodes `params`, frames a request for `path.class`/`path.method`, writes it to `stream`,
    /// reads the response frame, and decodes its payload. Transport/codec/dispatch failures all
    /// surface as `Err` — there is no separate "zero value in the last output slot" convention
    /// here since Rust already has `Result` for that (spec.md §9, redesign (b)).
    pub fn invoke(
        &self,
        stream: &mut TcpStream,
        path: &ServicePath,
        params: &[Value],
    ) -> Result<Vec<Value>, Error> {
        let codec = codec_for(self.option.serialize_type);
        let payload = codec.encode(params)?;

        let mut request = WireMessage::new_request(self.option.serialize_type);
        request.service_class = path.class.clone();
        request.service_method = path.method.clone();
        request.payload = payload;
        request.send(stream)?;

        trace!("invoked {path}, awaiting response");

        let response = WireMessage::read(stream)?;
        let response_codec = codec_for(response.header.serialize_type);

        match decode_response(&response.payload, response_codec) {
            Ok(results) => Ok(results),
            Err(message) => Err(crate::error::DispatchError::Handler(message).into()),
        }
    }

    /// Closes the underlying socket.
    pub fn close(stream: TcpStream) {
        drop(stream);
    }
}
