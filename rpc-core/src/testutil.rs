// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! An in-process pipe built on `socketpair(2)`, for exercising frame encode/decode without a
//! real TCP socket.

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};

pub struct Endpoint {
    fd: std::os::fd::OwnedFd,
}

pub fn pipe() -> std::io::Result<(Endpoint, Endpoint)> {
    let (a, b) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    )?;

    Ok((Endpoint { fd: a }, Endpoint { fd: b }))
}

impl std::io::Read for Endpoint {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(nix::unistd::read(&self.fd, buf)?)
    }
}

impl std::io::Write for Endpoint {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(nix::unistd::write(&self.fd, buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SerializeType, WireMessage};
    use std::io::Read;

    #[test]
    fn frame_round_trips_over_pipe() {
        let (mut a, mut b) = pipe().unwrap();

        let mut msg = WireMessage::new_request(SerializeType::Binary);
        msg.service_class = "User".into();
        msg.service_method = "GetUserByID".into();
        msg.payload = vec![1, 2, 3];
        msg.send(&mut a).unwrap();

        let received = WireMessage::read(&mut b).unwrap();
        assert_eq!(received, msg);

        drop(a);
        let mut rest = Vec::new();
        let _ = b.read_to_end(&mut rest);
    }
}
