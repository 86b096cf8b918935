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

//! Fan-out of encoded messages to a fixed set of destinations.
//!
//! # Introduction
//!
//! A [`Dispatcher`] owns a tuple of [`Destination`]s, fixed when it's constructed. Every message
//! is delivered to each of them in declaration order, each delivery inside that destination's own
//! critical section:
//!
//! ```rust
//! use mipi_syst::{destination::MemoryDestination, dispatcher::Dispatcher};
//!
//! let (a, b) = (MemoryDestination::new(), MemoryDestination::new());
//! let dispatcher = Dispatcher::new((a.clone(), b.clone()));
//! dispatcher.log_build(0x12_3456, None).unwrap();
//! assert_eq!(a.records(), b.records());
//! ```
//!
//! # Design
//!
//! Each destination sits behind its own [`Mutex`], taken only around the single transport call &
//! released on every way out of it (including a panicking destination; [`parking_lot`] mutexes
//! don't poison). This guarantees that the words of one message are never torn at a given
//! destination. It guarantees nothing about ordering _between_ destinations, nor between two
//! producers racing for the same destination: first to the lock wins.
//!
//! [`parking_lot`]: https://docs.rs/parking_lot
//!
//! Delivery is best-effort, not transactional: a failing destination does not prevent delivery to
//! the ones after it. The first error encountered is returned to the caller, unmodified; any
//! subsequent errors are dropped. Nothing in here logs, since the caller is very likely a logger.

use crate::{
    catalog::{ModuleId, StringId},
    destination::Destination,
    encoder::{encode_build, encode_catalog, Args, Message},
    error::Result,
    level::Level,
};

use parking_lot::Mutex;
use tracing::debug;

/// Run `body` against `dest` while holding its lock.
pub fn run_exclusively<D, R>(dest: &Mutex<D>, body: impl FnOnce(&mut D) -> R) -> R {
    let mut guard = dest.lock();
    body(&mut guard)
}

fn deliver_exclusively<D: Destination>(dest: &Mutex<D>, message: &Message) -> Result<()> {
    run_exclusively(dest, |dest| match message {
        Message::Args(args) => dest.log_by_args(args.as_slice()),
        Message::Buffer(buf) => dest.log_by_buf(buf),
    })
}

/// An ordered, fixed set of guarded destinations.
pub trait DestinationSet: Send + Sync {
    /// How many destinations are in the set
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Deliver `message` to every destination in declaration order; return the first failure
    fn deliver(&self, message: &Message) -> Result<()>;
}

/// Anything that can become a [`DestinationSet`]: tuples of up to eight [`Destination`]s.
pub trait IntoDestinationSet {
    type Set: DestinationSet;
    fn into_set(self) -> Self::Set;
}

impl DestinationSet for () {
    fn len(&self) -> usize {
        0
    }
    fn deliver(&self, _message: &Message) -> Result<()> {
        Ok(())
    }
}

impl IntoDestinationSet for () {
    type Set = ();
    fn into_set(self) {}
}

macro_rules! destination_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Destination),+> DestinationSet for ($(Mutex<$name>,)+) {
            fn len(&self) -> usize {
                [$($idx),+].len()
            }
            fn deliver(&self, message: &Message) -> Result<()> {
                let mut first = None;
                $(
                    if let Err(err) = deliver_exclusively(&self.$idx, message) {
                        first.get_or_insert(err);
                    }
                )+
                first.map_or(Ok(()), Err)
            }
        }

        impl<$($name: Destination),+> IntoDestinationSet for ($($name,)+) {
            type Set = ($(Mutex<$name>,)+);
            fn into_set(self) -> Self::Set {
                ($(Mutex::new(self.$idx),)+)
            }
        }
    };
}

destination_tuple!(A: 0);
destination_tuple!(A: 0, B: 1);
destination_tuple!(A: 0, B: 1, C: 2);
destination_tuple!(A: 0, B: 1, C: 2, D: 3);
destination_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
destination_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
destination_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
destination_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Delivers SyS-T messages to a fixed set of destinations.
pub struct Dispatcher<S: DestinationSet> {
    destinations: S,
}

impl<S: DestinationSet> Dispatcher<S> {
    /// Take ownership of `destinations` (a tuple of [`Destination`] implementations) for the life
    /// of this [`Dispatcher`].
    pub fn new<T: IntoDestinationSet<Set = S>>(destinations: T) -> Self {
        let destinations = destinations.into_set();
        debug!(
            "mipi-syst: dispatching to {} destination(s)",
            destinations.len()
        );
        Dispatcher { destinations }
    }
    /// The destinations, each behind its lock
    pub fn destinations(&self) -> &S {
        &self.destinations
    }
    pub fn len(&self) -> usize {
        self.destinations.len()
    }
    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }
    /// Deliver an already-encoded message
    pub fn dispatch(&self, message: &Message) -> Result<()> {
        self.destinations.deliver(message)
    }
    /// Deliver a fixed word list via each destination's `log_by_args`; fails without delivering
    /// anything if `words` is empty or longer than [`MAX_ARG_WORDS`](crate::encoder::MAX_ARG_WORDS).
    pub fn dispatch_by_args(&self, words: &[u32]) -> Result<()> {
        self.dispatch(&Message::Args(Args::from_words(words)?))
    }
    /// Deliver a buffer via each destination's `log_by_buf`
    pub fn dispatch_by_buf(&self, words: &[u32]) -> Result<()> {
        self.dispatch(&Message::Buffer(words.to_vec()))
    }
    /// Encode & deliver a catalog message
    pub fn log(&self, level: Level, module: ModuleId, id: StringId, args: &[u32]) -> Result<()> {
        self.dispatch(&encode_catalog(level, module, id, args))
    }
    /// Encode & deliver a build message; see [`encode_build`]
    pub fn log_build(&self, version: u64, text: Option<&[u8]>) -> Result<()> {
        self.dispatch(&encode_build(version, text)?)
    }
}
