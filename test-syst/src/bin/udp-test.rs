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

//! Test writing SyS-T messages over UDP to a listener on the local host.

use mipi_syst::{dispatcher::Dispatcher, transport::UdpDestination};
use tracing::{debug, error, info, trace, warn};
use tracing_syst::layer::Layer;
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::{net::UdpSocket, sync::Arc, time::Duration};

fn words(datagram: &[u8]) -> Vec<u32> {
    datagram
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

pub fn main() {
    let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
    rx.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    // Setup the real subscriber...
    let dispatcher = Arc::new(Dispatcher::new((
        UdpDestination::new(rx.local_addr().unwrap()).unwrap(),
    )));
    let layer: Layer<Registry, _, _> = Layer::with_dispatcher(dispatcher.clone());
    let catalog = layer.mapper().catalog().clone();
    let subscriber = Registry::default().with(layer);
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, SyS-T!");
    debug!(a = 1u32, "one argument: %u");
    info!(a = 1u32, b = 2u32, "two arguments: %u %u");
    warn!(a = 1u32, b = 2u32, c = 3u32, "three arguments: %u %u %u");
    error!(code = -5i32, "failed with %d");
    dispatcher
        .log_build(0x0001_0002_0003, Some(b"udp-test"))
        .unwrap();

    let mut buf = [0u8; 1024];
    for _ in 0..6 {
        let n = rx.recv(&mut buf).unwrap();
        println!("{:08x?}", words(&buf[..n]));
    }
    for (id, format) in catalog.strings() {
        println!("{:>4} {}", id, format);
    }
}
