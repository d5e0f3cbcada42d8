// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::*;

use crate::error::DispatchError;
use crate::protocol::{codec_for, unwrap_response, wrap_error, wrap_success, WireMessage};
use crate::server::handler::HandlerRegistry;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Tracks how many per-connection loops are currently running, so `shutdown` can wait for them
/// to drain instead of polling (spec.md §9's "shutdown's busy-wait should be a condition
/// variable").
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    fn increment(&self) {
        *self.count.lock().unwrap() += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    fn wait_for_drain(&self) {
        let guard = self.count.lock().unwrap();
        let _guard = self
            .drained
            .wait_while(guard, |count| *count != 0)
            .unwrap();
    }
}

/// Accepts TCP connections and drives the per-connection read/dispatch/write loop, with
/// cooperative shutdown and in-flight accounting.
pub struct Listener {
    local_addr: SocketAddr,
    shutdown_flag: Arc<AtomicBool>,
    in_flight: Arc<InFlight>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Listener {
    /// Binds `addr` and immediately starts the accept loop on its own thread.
    pub fn bind(addr: impl std::net::ToSocketAddrs, handlers: Arc<HandlerRegistry>) -> io::Result<Self> {
        let accept_socket = TcpListener::bind(addr)?;
        accept_socket.set_nonblocking(true)?;
        let local_addr = accept_socket.local_addr()?;

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(InFlight::default());

        let thread_shutdown = shutdown_flag.clone();
        let thread_in_flight = in_flight.clone();
        let accept_thread = thread::spawn(move || {
            accept_loop(accept_socket, handlers, thread_shutdown, thread_in_flight);
        });

        info!("listener bound to {local_addr}");

        Ok(Self {
            local_addr,
            shutdown_flag,
            in_flight,
            accept_thread: Mutex::new(Some(accept_thread)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sets the shutdown flag, waits for every connection currently in flight to finish, then
    /// closes the accept socket (by letting the accept thread return, which drops it).
    pub fn shutdown(&self) {
        info!("listener shutdown requested, draining in-flight connections");
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.in_flight.wait_for_drain();
        self.join_accept_thread();
        info!("listener shutdown complete");
    }

    /// Closes the accept socket immediately, ignoring any in-flight work.
    pub fn close(&self) {
        warn!("listener close requested, not draining in-flight connections");
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.join_accept_thread();
    }

    fn join_accept_thread(&self) {
        if let Some(handle) = self.accept_thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn accept_loop(
    accept_socket: TcpListener,
    handlers: Arc<HandlerRegistry>,
    shutdown_flag: Arc<AtomicBool>,
    in_flight: Arc<InFlight>,
) {
    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            debug!("accept loop observed shutdown flag");
            break;
        }

        match accept_socket.accept() {
            Ok((stream, peer)) => {
                let handlers = handlers.clone();
                let shutdown_flag = shutdown_flag.clone();
                let in_flight = in_flight.clone();
                thread::spawn(move || {
                    handle_connection(stream, peer, &handlers, &shutdown_flag, &in_flight);
                });
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                if shutdown_flag.load(Ordering::SeqCst) {
                    break;
                }
                warn!("error accepting connection: {e}");
            }
        }
    }

    debug!("accept loop exited");
}

enum LoopOutcome {
    Continue,
    Stop,
}

fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handlers: &Arc<HandlerRegistry>,
    shutdown_flag: &Arc<AtomicBool>,
    in_flight: &Arc<InFlight>,
) {
    loop {
        if shutdown_flag.load(Ordering::SeqCst) {
            return;
        }

        // A connection parked here, blocked on the next frame, is idle rather than
        // in flight: it must not hold `in_flight` above zero, or `shutdown` would wait
        // for every keep-alive connection to be closed by its peer instead of just for
        // requests actually being processed.
        let request = match WireMessage::read(&mut stream) {
            Ok(request) => request,
            Err(e) => {
                debug!("framing error, closing connection: {e}");
                return;
            }
        };

        // Increment/decrement are paired per iteration, unlike the original implementation
        // this is descended from, which only decremented once via an outer `defer`.
        in_flight.increment();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            handle_one_request(&mut stream, handlers, request)
        }));
        in_flight.decrement();

        match outcome {
            Ok(LoopOutcome::Continue) => continue,
            Ok(LoopOutcome::Stop) => {
                trace!("connection from {peer} closed");
                return;
            }
            Err(panic) => {
                warn!("handler panicked for {peer}: {panic:?}");
                return;
            }
        }
    }
}

fn handle_one_request(
    stream: &mut TcpStream,
    handlers: &Arc<HandlerRegistry>,
    request: WireMessage,
) -> LoopOutcome {
    let codec = codec_for(request.header.serialize_type);

    let args = match codec.decode(&request.payload) {
        Ok(args) => args,
        Err(e) => {
            debug!("codec decode error, closing connection: {e}");
            return LoopOutcome::Stop;
        }
    };

    let dispatch_result = match handlers.get(&request.service_class) {
        Some(service) => service.handle(&request.service_method, args),
        None => Err(DispatchError::UnknownClass(request.service_class.clone())),
    };

    let result_values = match dispatch_result {
        Ok(results) => wrap_success(results),
        Err(e) => {
            debug!("dispatch error, returning structured error response: {e}");
            wrap_error(e.to_string())
        }
    };

    let payload = match codec.encode(&result_values) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("failed to encode response, closing connection: {e}");
            return LoopOutcome::Stop;
        }
    };

    let mut response = WireMessage::new_response(request.header.serialize_type);
    response.service_class = request.service_class;
    response.service_method = request.service_method;
    response.payload = payload;

    if let Err(e) = response.send(stream) {
        debug!("write error, closing connection: {e}");
        return LoopOutcome::Stop;
    }

    LoopOutcome::Continue
}

/// Decodes a response frame's payload back into either a successful result list or the
/// dispatch-level error message it carries. Used by the client, kept here alongside the
/// response-shaping logic it mirrors.
pub fn decode_response(payload: &[u8], codec: &dyn crate::protocol::Codec) -> Result<Vec<crate::protocol::Value>, String> {
    let values = codec
        .decode(payload)
        .map_err(|e| format!("codec error: {e}"))?;
    unwrap_response(values)
}
