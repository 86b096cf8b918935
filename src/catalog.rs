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

//! Catalog identifiers.
//!
//! A SyS-T catalog message never carries its format string; it carries a [`StringId`] that the
//! receiver resolves against a table built alongside the producer. Likewise the originating module
//! is reduced to a [`ModuleId`]. Handing out those ids is the job of a [`Catalog`].
//!
//! The ideal catalog does its work at build time, scanning log call sites & emitting a lookup
//! table. [`InterningCatalog`] is the simplest thing that honors the [`Catalog`] contract at run
//! time: ids are assigned in order of first appearance, and the resulting tables can be dumped for
//! whatever is decoding the trace.
//!
//! ```rust
//! use mipi_syst::catalog::{Catalog, InterningCatalog};
//! let catalog = InterningCatalog::new();
//! let a = catalog.string_id("temperature is {}").unwrap();
//! let b = catalog.string_id("pressure is {}").unwrap();
//! assert_ne!(a, b);
//! assert_eq!(a, catalog.string_id("temperature is {}").unwrap());
//! ```

use crate::error::{Error, Result};

use backtrace::Backtrace;
use parking_lot::Mutex;

use std::collections::HashMap;

/// Identifies a registered format string; the SyS-T short32 form leaves 28 bits for it
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringId(pub u32);

impl StringId {
    /// Largest id representable in a short32 message
    pub const MAX: u32 = (1 << 28) - 1;
}

impl std::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::convert::From<u32> for StringId {
    fn from(x: u32) -> Self {
        StringId(x)
    }
}

/// Identifies the module from which a message originated; it occupies bits 16..24 of a catalog
/// header
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub u32);

impl ModuleId {
    /// Largest id representable in a catalog header
    pub const MAX: u32 = 0xff;
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::convert::From<u32> for ModuleId {
    fn from(x: u32) -> Self {
        ModuleId(x)
    }
}

/// Operations all catalogs must support.
///
/// Implementations must hand out stable, unique ids: the same format string (or module name)
/// always maps to the same id, & distinct ones never share an id.
pub trait Catalog: Send + Sync {
    /// Look up (or assign) the id for `format`
    fn string_id(&self, format: &str) -> Result<StringId>;
    /// Look up (or assign) the id for `module`
    fn module_id(&self, module: &str) -> Result<ModuleId>;
}

impl<C: Catalog + ?Sized> Catalog for std::sync::Arc<C> {
    fn string_id(&self, format: &str) -> Result<StringId> {
        (**self).string_id(format)
    }
    fn module_id(&self, module: &str) -> Result<ModuleId> {
        (**self).module_id(module)
    }
}

#[derive(Default)]
struct Tables {
    strings: HashMap<String, StringId>,
    modules: HashMap<String, ModuleId>,
}

/// A [`Catalog`] that assigns ids at run time, in order of first appearance.
#[derive(Default)]
pub struct InterningCatalog {
    tables: Mutex<Tables>,
}

impl InterningCatalog {
    pub fn new() -> InterningCatalog {
        InterningCatalog::default()
    }
    /// The string table, sorted by id
    pub fn strings(&self) -> Vec<(StringId, String)> {
        let tables = self.tables.lock();
        let mut out: Vec<(StringId, String)> = tables
            .strings
            .iter()
            .map(|(s, id)| (*id, s.clone()))
            .collect();
        out.sort();
        out
    }
    /// The module table, sorted by id
    pub fn modules(&self) -> Vec<(ModuleId, String)> {
        let tables = self.tables.lock();
        let mut out: Vec<(ModuleId, String)> = tables
            .modules
            .iter()
            .map(|(s, id)| (*id, s.clone()))
            .collect();
        out.sort();
        out
    }
    /// Reverse lookup: the format string registered under `id`, if any
    pub fn format(&self, id: StringId) -> Option<String> {
        self.tables
            .lock()
            .strings
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(s, _)| s.clone())
    }
}

// Return the id for `key`, assigning the next one in sequence if it's new.
fn intern<T: Copy>(
    map: &mut HashMap<String, T>,
    key: &str,
    kind: &'static str,
    limit: u32,
    make: fn(u32) -> T,
) -> Result<T> {
    if let Some(id) = map.get(key) {
        return Ok(*id);
    }
    let next = map.len() as u32;
    if next > limit {
        return Err(Error::CatalogExhausted {
            kind,
            limit,
            back: Backtrace::new(),
        });
    }
    let id = make(next);
    // No logging here: a tracing layer may be calling us from inside an event.
    map.insert(key.to_owned(), id);
    Ok(id)
}

impl Catalog for InterningCatalog {
    fn string_id(&self, format: &str) -> Result<StringId> {
        let mut tables = self.tables.lock();
        intern(
            &mut tables.strings,
            format,
            "string",
            StringId::MAX,
            StringId,
        )
    }
    fn module_id(&self, module: &str) -> Result<ModuleId> {
        let mut tables = self.tables.lock();
        intern(
            &mut tables.modules,
            module,
            "module",
            ModuleId::MAX,
            ModuleId,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_are_stable_and_sequential() {
        let catalog = InterningCatalog::new();
        assert_eq!(catalog.string_id("a {}").unwrap(), StringId(0));
        assert_eq!(catalog.string_id("b {}").unwrap(), StringId(1));
        assert_eq!(catalog.string_id("a {}").unwrap(), StringId(0));
        assert_eq!(catalog.module_id("app::net").unwrap(), ModuleId(0));
        assert_eq!(catalog.module_id("app::disk").unwrap(), ModuleId(1));
        assert_eq!(catalog.module_id("app::net").unwrap(), ModuleId(0));

        assert_eq!(
            catalog.strings(),
            vec![(StringId(0), "a {}".to_string()), (StringId(1), "b {}".to_string())]
        );
        assert_eq!(catalog.modules()[1], (ModuleId(1), "app::disk".to_string()));
        assert_eq!(catalog.format(StringId(1)), Some("b {}".to_string()));
        assert_eq!(catalog.format(StringId(7)), None);
    }

    #[test]
    fn modules_run_out() {
        let catalog = InterningCatalog::new();
        for i in 0..=ModuleId::MAX {
            assert_eq!(
                catalog.module_id(&format!("m{}", i)).unwrap(),
                ModuleId(i)
            );
        }
        // Known names still resolve...
        assert_eq!(catalog.module_id("m3").unwrap(), ModuleId(3));
        // but there's no room for a new one.
        match catalog.module_id("one too many") {
            Err(Error::CatalogExhausted { kind, limit, .. }) => {
                assert_eq!(kind, "module");
                assert_eq!(limit, ModuleId::MAX);
            }
            other => panic!("expected CatalogExhausted, got {:?}", other),
        }
    }

    #[test]
    fn strings_run_out() {
        let mut strings = HashMap::new();
        for i in 0..=3 {
            assert_eq!(
                intern(&mut strings, &format!("s{}", i), "string", 3, StringId).unwrap(),
                StringId(i)
            );
        }
        assert_eq!(
            intern(&mut strings, "s1", "string", 3, StringId).unwrap(),
            StringId(1)
        );
        match intern(&mut strings, "s4", "string", 3, StringId) {
            Err(Error::CatalogExhausted { kind, limit, .. }) => {
                assert_eq!(kind, "string");
                assert_eq!(limit, 3);
            }
            other => panic!("expected CatalogExhausted, got {:?}", other),
        }
        assert_eq!(strings.len(), 4);
    }

    #[test]
    fn shared_through_arc() {
        let catalog = std::sync::Arc::new(InterningCatalog::new());
        let other = catalog.clone();
        let id = catalog.string_id("shared").unwrap();
        assert_eq!(other.string_id("shared").unwrap(), id);
    }
}
