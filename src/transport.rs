// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of mipi-syst.
//
// mipi-syst is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mipi-syst is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mipi-syst.  If not,
// see <http://www.gnu.org/licenses/>.

//! Socket transports.
//!
//! Both transports here are datagram-based: each SyS-T message goes out as exactly one datagram
//! whose payload is the message's words in little-endian order. Datagram boundaries delimit
//! messages, so the two [`Destination`] methods behave identically.
//!
//! # Examples
//!
//! To send SyS-T messages over UDP to a collector listening on port 5555 on localhost:
//!
//! ```no_run
//! use mipi_syst::transport::UdpDestination;
//! let dest = UdpDestination::new("127.0.0.1:5555").unwrap();
//! ```
//!
//! To send them to a local Unix datagram socket:
//!
//! ```rust
//! use mipi_syst::transport::UnixDatagramDestination;
//! let dest = UnixDatagramDestination::new("/i/am/not/there.s");
//! assert!(dest.is_err()); // no such socket, after all
//! ```

use crate::{destination::Destination, error::Error, error::Result};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

#[cfg(unix)]
use std::{os::unix::net::UnixDatagram, path::Path};

/// Lay out `words` little-endian, the order in which they go on the wire
pub fn words_to_le_bytes(words: &[u32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(words.len() * 4);
    for word in words {
        buf.put_u32_le(*word);
    }
    buf.freeze()
}

/// Sending SyS-T messages via UDP datagrams.
pub struct UdpDestination {
    socket: std::net::UdpSocket,
}

impl UdpDestination {
    /// Construct a [`Destination`] that sends via UDP to `addr`.
    ///
    /// The first address `addr` resolves to is used; the local socket is bound to an ephemeral
    /// port on the unspecified address of the same family.
    pub fn new<A: std::net::ToSocketAddrs>(addr: A) -> Result<UdpDestination> {
        let peer = addr
            .to_socket_addrs()
            .map_err(Error::transport)?
            .next()
            .ok_or_else(|| {
                Error::transport(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "no address to send to",
                ))
            })?;
        // Bind to any available port...
        let local: std::net::SocketAddr = match peer {
            std::net::SocketAddr::V4(_) => (std::net::Ipv4Addr::UNSPECIFIED, 0).into(),
            std::net::SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = std::net::UdpSocket::bind(local).map_err(Error::transport)?;
        // and connect to the collector at `addr`:
        socket.connect(peer).map_err(Error::transport)?;
        debug!(
            "mipi-syst: UDP destination {:?} -> {:?}",
            socket.local_addr().ok(),
            socket.peer_addr().ok()
        );
        Ok(UdpDestination { socket })
    }
    fn send(&self, words: &[u32]) -> Result<()> {
        self.socket
            .send(&words_to_le_bytes(words))
            .map_err(Error::transport)?;
        Ok(())
    }
}

impl Destination for UdpDestination {
    fn log_by_args(&mut self, words: &[u32]) -> Result<()> {
        self.send(words)
    }
    fn log_by_buf(&mut self, words: &[u32]) -> Result<()> {
        self.send(words)
    }
}

/// Sending SyS-T messages via Unix socket (datagram)
#[cfg(unix)]
pub struct UnixDatagramDestination {
    socket: UnixDatagram,
}

#[cfg(unix)]
impl UnixDatagramDestination {
    /// Construct a [`Destination`] that sends via Unix datagram sockets to `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<UnixDatagramDestination> {
        let sock = UnixDatagram::unbound().map_err(Error::transport)?;
        sock.connect(path.as_ref()).map_err(Error::transport)?;
        debug!("mipi-syst: Unix datagram destination -> {:?}", path.as_ref());
        Ok(UnixDatagramDestination { socket: sock })
    }
    fn send(&self, words: &[u32]) -> Result<()> {
        self.socket
            .send(&words_to_le_bytes(words))
            .map_err(Error::transport)?;
        Ok(())
    }
}

#[cfg(unix)]
impl Destination for UnixDatagramDestination {
    fn log_by_args(&mut self, words: &[u32]) -> Result<()> {
        self.send(words)
    }
    fn log_by_buf(&mut self, words: &[u32]) -> Result<()> {
        self.send(words)
    }
}
