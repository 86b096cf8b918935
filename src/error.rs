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
//! [mipi-syst](crate) errors

use backtrace::Backtrace;

/// [mipi-syst](crate) error type
///
/// Encoding is total over well-formed input, so there are very few of these. Like
/// [syslog-tracing], [mipi-syst](crate) eschews libraries like [thiserror] & [anyhow] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis of what the caller will
/// need to respond.
///
/// [syslog-tracing]: https://github.com/sp1ff/syslog-tracing
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
#[non_exhaustive]
pub enum Error {
    /// The text attached to a build message won't fit in the 16-bit length field of the long form
    BuildTextTooLong { len: usize, back: Backtrace },
    /// A catalog ran out of ids for `kind` ("string" or "module")
    CatalogExhausted {
        kind: &'static str,
        limit: u32,
        back: Backtrace,
    },
    /// A fixed word list must hold between one & four words
    ArgumentCount { len: usize, back: Backtrace },
    /// A numeric level didn't correspond to any [`Level`](crate::level::Level)
    UnknownLevel { value: u8, back: Backtrace },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl Error {
    /// Convenience constructor for the common case of wrapping an I/O failure
    pub fn transport<E>(err: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BuildTextTooLong { len, .. } => write!(
                f,
                "A build string of {} bytes overflows the 16-bit length field of a SyS-T long build message",
                len
            ),
            Error::CatalogExhausted { kind, limit, .. } => write!(
                f,
                "The catalog has no {} ids left (the largest representable id is {:#x})",
                kind, limit
            ),
            Error::ArgumentCount { len, .. } => write!(
                f,
                "A fixed SyS-T word list holds one to four words, not {}",
                len
            ),
            Error::UnknownLevel { value, .. } => write!(f, "{} is not a known log level", value),
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            _ => write!(f, "Other mipi-syst error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BuildTextTooLong { len: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::CatalogExhausted { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::ArgumentCount { len: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::UnknownLevel { value: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "mipi-syst error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
