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

//! Test writing SyS-T messages to a Unix datagram socket on the local host.

use mipi_syst::{
    catalog::ModuleId, dispatcher::Dispatcher, encoder::catalog32_header, level::Level,
    transport::UnixDatagramDestination,
};
use tracing::{info, warn};
use tracing_syst::layer::Layer;
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::{os::unix::net::UnixDatagram, sync::Arc};

pub fn main() {
    let path = std::env::temp_dir().join(format!("unix-socket-test-{}.s", std::process::id()));
    let rx = UnixDatagram::bind(&path).unwrap();

    let dispatcher = Arc::new(Dispatcher::new((
        UnixDatagramDestination::new(&path).unwrap(),
    )));
    let subscriber = Registry::default().with(Layer::with_dispatcher(dispatcher));
    let _guard = tracing::subscriber::set_default(subscriber);

    info!("你好, Unix domain socket.");
    warn!(n = 3u32, "%u warnings, Unix domain socket.");

    let mut buf = [0u8; 64];
    let n = rx.recv(&mut buf).unwrap();
    // First string id (zero), short32 form
    assert_eq!(&buf[..n], &1u32.to_le_bytes()[..]);
    let n = rx.recv(&mut buf).unwrap();
    assert_eq!(n, 12);
    assert_eq!(
        &buf[..4],
        &catalog32_header(Level::Warn, ModuleId(0)).to_le_bytes()[..]
    );
    println!("ok");

    std::fs::remove_file(&path).unwrap();
}
