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
//! Encode catalog log messages in the [MIPI SyS-T] binary trace format & deliver them to a fixed
//! set of destinations.
//!
//! [MIPI SyS-T]: https://www.mipi.org/specifications/sys-t
//!
//! # Introduction
//!
//! Text logging is expensive on small systems: the format strings take up flash, formatting takes
//! up cycles & the result takes up bandwidth. SyS-T "catalog" messages sidestep all three by never
//! sending the format string at all. Each distinct message is assigned an integer id ahead of time
//! (a [catalog]), and at run time only that id, a level, a module id & the raw numeric arguments go
//! out over the wire; the receiver re-assembles the text from its copy of the catalog.
//!
//! [catalog]: crate::catalog
//!
//! This crate is the wire-format layer of such a facility. It takes a log call already reduced to
//! numbers & turns it into a byte-exact sequence of 32-bit SyS-T words ([`encoder`]), then hands
//! those words to every configured destination, each under its own lock ([`dispatcher`]). It can
//! also encode a build/version identifier as a SyS-T build message.
//!
//! # Usage
//!
//! ```rust
//! use mipi_syst::{
//!     catalog::{Catalog, InterningCatalog},
//!     destination::MemoryDestination,
//!     dispatcher::Dispatcher,
//!     level::Level,
//! };
//!
//! let catalog = InterningCatalog::new();
//! let mem = MemoryDestination::new();
//! let dispatcher = Dispatcher::new((mem.clone(),));
//!
//! let id = catalog.string_id("fan speed is {} rpm").unwrap();
//! let module = catalog.module_id("thermal").unwrap();
//! dispatcher.log(Level::Info, module, id, &[1200]).unwrap();
//! dispatcher.log_build(0x0102_0003, None).unwrap();
//!
//! assert_eq!(mem.len(), 2);
//! ```
//!
//! To get [`tracing`] events into this format, see the companion crate `tracing-syst`.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html

pub mod catalog;
pub mod destination;
pub mod dispatcher;
pub mod encoder;
pub mod error;
pub mod level;
pub mod transport;
