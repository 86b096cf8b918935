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

//! Operations all destinations must support.
//!
//! A destination is wherever encoded SyS-T words end up: a trace port, a ring buffer in shared
//! memory, a socket. This module defines the [`Destination`] trait along with an in-memory
//! implementation, [`MemoryDestination`]. Socket implementations live in
//! [`transport`](crate::transport).

use crate::error::Result;

use parking_lot::Mutex;

use std::sync::Arc;

/// The capability set every destination must expose.
///
/// The [`Dispatcher`](crate::dispatcher::Dispatcher) holds each destination behind its own mutex,
/// so implementations may assume at most one call is in flight at a time & need not worry about
/// the words of two messages interleaving.
///
/// The two methods differ only in what the caller promises about the words: `log_by_args` gets a
/// short list (at most [`MAX_ARG_WORDS`](crate::encoder::MAX_ARG_WORDS)) whose length is implied
/// by the call site, whereas `log_by_buf` gets a buffer whose length the destination may need to
/// convey.
pub trait Destination: Send {
    /// Emit a fixed, short list of words
    fn log_by_args(&mut self, words: &[u32]) -> Result<()>;
    /// Emit a buffer of words
    fn log_by_buf(&mut self, words: &[u32]) -> Result<()>;
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn log_by_args(&mut self, words: &[u32]) -> Result<()> {
        (**self).log_by_args(words)
    }
    fn log_by_buf(&mut self, words: &[u32]) -> Result<()> {
        (**self).log_by_buf(words)
    }
}

impl<D: Destination + ?Sized> Destination for &mut D {
    fn log_by_args(&mut self, words: &[u32]) -> Result<()> {
        (**self).log_by_args(words)
    }
    fn log_by_buf(&mut self, words: &[u32]) -> Result<()> {
        (**self).log_by_buf(words)
    }
}

/// Which capability delivered a [`Record`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Form {
    Args,
    Buffer,
}

/// One message as seen by a [`MemoryDestination`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub form: Form,
    pub words: Vec<u32>,
}

/// A [`Destination`] that just remembers what it was given.
///
/// Clones share the same record list, so keep one handle around before handing another to a
/// [`Dispatcher`](crate::dispatcher::Dispatcher):
///
/// ```rust
/// use mipi_syst::{destination::MemoryDestination, dispatcher::Dispatcher};
/// use mipi_syst::{catalog::{ModuleId, StringId}, level::Level};
///
/// let mem = MemoryDestination::new();
/// let dispatcher = Dispatcher::new((mem.clone(),));
/// dispatcher.log(Level::Info, ModuleId(7), StringId(100), &[42]).unwrap();
/// assert_eq!(mem.records()[0].words, vec![0x01070023, 100, 42]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryDestination {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemoryDestination {
    pub fn new() -> MemoryDestination {
        MemoryDestination::default()
    }
    /// A snapshot of everything received so far
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }
    /// Take everything received so far, leaving the list empty
    pub fn drain(&self) -> Vec<Record> {
        std::mem::take(&mut *self.records.lock())
    }
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Destination for MemoryDestination {
    fn log_by_args(&mut self, words: &[u32]) -> Result<()> {
        self.records.lock().push(Record {
            form: Form::Args,
            words: words.to_vec(),
        });
        Ok(())
    }
    fn log_by_buf(&mut self, words: &[u32]) -> Result<()> {
        self.records.lock().push(Record {
            form: Form::Buffer,
            words: words.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory_destination_shares_records() {
        let mem = MemoryDestination::new();
        let mut other = mem.clone();
        other.log_by_args(&[1, 2]).unwrap();
        other.log_by_buf(&[3, 4, 5]).unwrap();
        assert_eq!(
            mem.records(),
            vec![
                Record {
                    form: Form::Args,
                    words: vec![1, 2]
                },
                Record {
                    form: Form::Buffer,
                    words: vec![3, 4, 5]
                }
            ]
        );
        assert_eq!(mem.drain().len(), 2);
        assert!(mem.is_empty());
    }

    #[test]
    fn boxed_destinations_forward() {
        let mem = MemoryDestination::new();
        let mut boxed: Box<dyn Destination> = Box::new(mem.clone());
        boxed.log_by_buf(&[9]).unwrap();
        assert_eq!(mem.records()[0].form, Form::Buffer);
    }
}
