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

//! SyS-T header & payload encoding.
//!
//! # Introduction
//!
//! Everything in this module is a pure function from a log call's numeric reduction (a [`Level`],
//! a [`ModuleId`], a [`StringId`] & some 32-bit arguments) to the 32-bit words of a MIPI SyS-T
//! message. Nothing here knows where those words are going; that's the
//! [`Dispatcher`](crate::dispatcher::Dispatcher)'s business.
//!
//! # Physical forms
//!
//! Every encoding produces a [`Message`] in one of two forms:
//!
//! - [`Message::Args`]: between one & four words, held inline. The count is fixed for any given
//!   call site, so destinations get no length prefix.
//!
//! - [`Message::Buffer`]: a heap-allocated run of words used when the argument count is larger
//!   than two, or when the payload is of variable length (the "long" build message).
//!
//! # Catalog messages
//!
//! | arguments | words                                  | form   |
//! |-----------|----------------------------------------|--------|
//! | 0         | `[(id << 4) \| 0x1]` (short32)         | args   |
//! | 1-2       | `[header, id, arg0, (arg1)]`           | args   |
//! | 3+        | `[header, id, arg0, arg1, arg2, ...]`  | buffer |
//!
//! where `header` is `(0x1 << 24) | (module << 16) | (level << 4) | 0x3`.
//!
//! # Build messages
//!
//! See [`encode_build`].

use crate::{
    catalog::{ModuleId, StringId},
    error::{Error, Result},
    level::Level,
};

use backtrace::Backtrace;
use bytes::{BufMut, BytesMut};

/// SyS-T message type: short32
pub const TYPE_SHORT32: u32 = 0x1;
/// SyS-T message type: catalog
pub const TYPE_CATALOG: u32 = 0x3;
/// Catalog subtype: 32-bit id, 32-bit payload words
pub const SUBTYPE_ID32_P32: u32 = 0x1;
/// Build subtype: compact64 (compact32 sets no subtype at all)
pub const SUBTYPE_COMPACT64: u32 = 0x1;
/// Build subtype: long
pub const SUBTYPE_LONG: u32 = 0x2;
/// Header flag announcing an explicit payload length
pub const OPT_LEN: u32 = 0x1 << 9;

/// The most words a [`Message::Args`] will ever carry
pub const MAX_ARG_WORDS: usize = 4;

/// Versions this wide or narrower (with no text) use the one-word compact32 form
pub const COMPACT32_VERSION_BITS: u32 = 22;
/// Versions this wide or narrower (with no text) use the two-word compact64 form
pub const COMPACT64_VERSION_BITS: u32 = 54;

const VERSION_HIGH_MASK: u64 = 0x30_0000;
const VERSION_LOW_MASK: u64 = 0xf_ffff;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          message forms                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A short, fixed list of words: the "pass by arguments" form.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Args {
    words: [u32; MAX_ARG_WORDS],
    len: usize,
}

impl Args {
    /// Collect `words`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArgumentCount`] if `words` is empty or longer than [`MAX_ARG_WORDS`].
    pub fn from_words(words: &[u32]) -> Result<Args> {
        if words.is_empty() || words.len() > MAX_ARG_WORDS {
            return Err(Error::ArgumentCount {
                len: words.len(),
                back: Backtrace::new(),
            });
        }
        Ok(Args::pack(words))
    }
    // Callers within this module always pass 1..=MAX_ARG_WORDS words.
    fn pack(words: &[u32]) -> Args {
        let mut out = Args {
            words: [0; MAX_ARG_WORDS],
            len: words.len(),
        };
        out.words[..words.len()].copy_from_slice(words);
        out
    }
    pub fn as_slice(&self) -> &[u32] {
        &self.words[..self.len]
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.as_slice().iter().map(|w| format!("{:#010x}", w)))
            .finish()
    }
}

/// One encoded SyS-T message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// A fixed word list, delivered via `log_by_args`
    Args(Args),
    /// A length-known buffer, delivered via `log_by_buf`
    Buffer(Vec<u32>),
}

impl Message {
    /// This message's words, whatever its form
    pub fn words(&self) -> &[u32] {
        match self {
            Message::Args(args) => args.as_slice(),
            Message::Buffer(buf) => buf.as_slice(),
        }
    }
    pub fn len(&self) -> usize {
        self.words().len()
    }
    pub fn is_empty(&self) -> bool {
        self.words().is_empty()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        catalog messages                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The single word of a zero-argument short32 message; level & module are not encoded.
///
/// `id` must not exceed [`StringId::MAX`]; wider ids lose their top bits.
pub const fn short32_header(id: StringId) -> u32 {
    debug_assert!(id.0 <= StringId::MAX, "string id too wide for short32");
    (id.0 << 4) | TYPE_SHORT32
}

/// The header word of a catalog (id32_p32) message.
///
/// `module` must not exceed [`ModuleId::MAX`]; wider ids would spill into the subtype field.
pub const fn catalog32_header(level: Level, module: ModuleId) -> u32 {
    debug_assert!(module.0 <= ModuleId::MAX, "module id too wide for a catalog header");
    (SUBTYPE_ID32_P32 << 24) | (module.0 << 16) | (level.value() << 4) | TYPE_CATALOG
}

/// Encode a catalog message carrying `args`, choosing the short32, fixed-word or buffer form by
/// argument count.
pub fn encode_catalog(level: Level, module: ModuleId, id: StringId, args: &[u32]) -> Message {
    let header = catalog32_header(level, module);
    match args {
        [] => Message::Args(Args::pack(&[short32_header(id)])),
        [a0] => Message::Args(Args::pack(&[header, id.0, *a0])),
        [a0, a1] => Message::Args(Args::pack(&[header, id.0, *a0, *a1])),
        _ => {
            let mut buf = Vec::with_capacity(2 + args.len());
            buf.push(header);
            buf.push(id.0);
            buf.extend_from_slice(args);
            Message::Buffer(buf)
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         build messages                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The number of bits needed to represent `x` (zero for zero)
pub const fn bit_width(x: u64) -> u32 {
    u64::BITS - x.leading_zeros()
}

// The low 22 bits of `version`, split around the type/subtype nibbles of the header.
const fn compact_version_bits(version: u64) -> u32 {
    (((version & VERSION_HIGH_MASK) << 10) | ((version & VERSION_LOW_MASK) << 4)) as u32
}

/// Encode a build message announcing `version`, with optional descriptive `text`.
///
/// The cheapest form that can hold the payload wins:
///
/// - no text, `version` at most 22 bits wide: compact32, one word
///
/// - no text, `version` at most 54 bits wide: compact64, two words; the second holds bits 22..54
///
/// - otherwise: long; the header is followed by a little-endian 16-bit length (eight plus the
///   length of `text`), the little-endian 64-bit version, & then `text`, all packed bytewise &
///   zero-padded to a whole number of words
///
/// Note that `Some(b"")` selects the long form; only `None` means "no text".
///
/// # Errors
///
/// Returns [`Error::BuildTextTooLong`] if eight plus the length of `text` won't fit in sixteen
/// bits.
pub fn encode_build(version: u64, text: Option<&[u8]>) -> Result<Message> {
    let width = bit_width(version);
    match text {
        None if width <= COMPACT32_VERSION_BITS => {
            Ok(Message::Args(Args::pack(&[compact_version_bits(version)])))
        }
        None if width <= COMPACT64_VERSION_BITS => Ok(Message::Args(Args::pack(&[
            compact_version_bits(version) | (SUBTYPE_COMPACT64 << 24),
            ((version >> COMPACT32_VERSION_BITS) & 0xffff_ffff) as u32,
        ]))),
        _ => encode_long_build(version, text.unwrap_or_default()),
    }
}

fn encode_long_build(version: u64, text: &[u8]) -> Result<Message> {
    let len = std::mem::size_of::<u64>() + text.len();
    let len16 = u16::try_from(len).map_err(|_| Error::BuildTextTooLong {
        len: text.len(),
        back: Backtrace::new(),
    })?;
    let byte_len = std::mem::size_of::<u32>() + std::mem::size_of::<u16>() + len;
    let word_len = byte_len.div_ceil(4);

    let mut buf = BytesMut::with_capacity(word_len * 4);
    buf.put_u32_le((SUBTYPE_LONG << 24) | OPT_LEN);
    buf.put_u16_le(len16);
    buf.put_u64_le(version);
    buf.put_slice(text);
    buf.resize(word_len * 4, 0);

    Ok(Message::Buffer(
        buf.chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    use proptest::prelude::*;

    fn le_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn end_to_end_examples() {
        let msg = encode_catalog(Level::Info, ModuleId(7), StringId(100), &[42]);
        assert_eq!(
            msg,
            Message::Args(Args::from_words(&[0x0107_0023, 100, 42]).unwrap())
        );
        assert_eq!(msg.words(), &[0x0107_0023, 100, 42]);

        let msg = encode_build(0x12_3456, None).unwrap();
        assert_eq!(
            msg.words(),
            &[(((0x12_3456u64 & 0x30_0000) << 10) | ((0x12_3456u64 & 0xf_ffff) << 4)) as u32]
        );
        assert_eq!(bit_width(0x12_3456), 21);
    }

    #[test]
    fn catalog_forms() {
        assert_eq!(
            encode_catalog(Level::Error, ModuleId(3), StringId(9), &[]).words(),
            &[0x91]
        );
        let msg = encode_catalog(Level::Warn, ModuleId(1), StringId(2), &[10, 11, 12]);
        match msg {
            Message::Buffer(ref buf) => assert_eq!(buf, &[0x0101_0033, 2, 10, 11, 12]),
            _ => panic!("three arguments should produce a buffer"),
        }
    }

    #[test]
    fn build_width_boundaries() {
        // 22 bits: compact32
        let v = (1u64 << 22) - 1;
        assert_eq!(encode_build(v, None).unwrap().len(), 1);
        // 23 bits: compact64
        let v = 1u64 << 22;
        let msg = encode_build(v, None).unwrap();
        assert_eq!(msg.words(), &[0x0100_0000, 1]);
        // 54 bits: still compact64
        let v = (1u64 << 54) - 1;
        assert_eq!(encode_build(v, None).unwrap().len(), 2);
        // 55 bits: long
        let v = 1u64 << 54;
        let msg = encode_build(v, None).unwrap();
        assert!(matches!(msg, Message::Buffer(_)));
        assert_eq!(msg.len(), 4);
        // zero is zero bits wide
        assert_eq!(encode_build(0, None).unwrap().words(), &[0]);
    }

    #[test]
    fn long_build_layout() {
        let msg = encode_build(0x0102_0304_0506_0708, Some(b"abc")).unwrap();
        let bytes = le_bytes(msg.words());
        // 4 + 2 + 8 + 3 = 17 bytes, rounded up to five words
        assert_eq!(msg.len(), 5);
        assert_eq!(msg.words()[0], 0x0200_0200);
        assert_eq!(&bytes[4..6], &[11, 0]);
        assert_eq!(&bytes[6..14], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[14..17], b"abc");
        assert_eq!(&bytes[17..], &[0, 0, 0]);

        // An empty string still selects the long form
        let msg = encode_build(1, Some(b"")).unwrap();
        assert!(matches!(msg, Message::Buffer(_)));
        assert_eq!(msg.len(), 4);
        assert_eq!(&le_bytes(msg.words())[4..6], &[8, 0]);
    }

    #[test]
    fn long_build_text_limit() {
        let max = vec![b'x'; u16::MAX as usize - 8];
        let msg = encode_build(1, Some(&max)).unwrap();
        assert_eq!(&le_bytes(msg.words())[4..6], &[0xff, 0xff]);

        let over = vec![b'x'; u16::MAX as usize - 7];
        match encode_build(1, Some(&over)) {
            Err(Error::BuildTextTooLong { len, .. }) => assert_eq!(len, over.len()),
            other => panic!("expected BuildTextTooLong, got {:?}", other),
        }
    }

    #[test]
    fn argument_counts() {
        assert_eq!(Args::from_words(&[1, 2, 3, 4]).unwrap().as_slice(), &[1, 2, 3, 4]);
        for words in [&[][..], &[0; MAX_ARG_WORDS + 1][..]] {
            match Args::from_words(words) {
                Err(Error::ArgumentCount { len, .. }) => assert_eq!(len, words.len()),
                other => panic!("expected ArgumentCount, got {:?}", other),
            }
        }
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "module id too wide")]
    fn wide_module_ids_are_caught() {
        encode_catalog(Level::Info, ModuleId(0x1ff), StringId(0), &[1]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "string id too wide")]
    fn wide_string_ids_are_caught() {
        encode_catalog(Level::Info, ModuleId(0), StringId(StringId::MAX + 1), &[]);
    }

    proptest! {
        #[test]
        fn short32_formula(id in 0u32..=StringId::MAX) {
            let msg = encode_catalog(Level::Debug, ModuleId(0), StringId(id), &[]);
            prop_assert_eq!(msg.words(), &[(id << 4) | 1]);
        }

        #[test]
        fn two_argument_form(
            level in 0u8..5,
            module in 0u32..=ModuleId::MAX,
            id in 0u32..=StringId::MAX,
            a0 in any::<u32>(),
            a1 in any::<u32>(),
        ) {
            let level = Level::try_from(level).unwrap();
            let header = (1 << 24) | (module << 16) | (level.value() << 4) | 3;
            let msg = encode_catalog(level, ModuleId(module), StringId(id), &[a0, a1]);
            prop_assert!(matches!(msg, Message::Args(_)));
            prop_assert_eq!(msg.words(), &[header, id, a0, a1]);
        }

        #[test]
        fn buffer_form(
            module in 0u32..=ModuleId::MAX,
            id in 0u32..=StringId::MAX,
            args in prop::collection::vec(any::<u32>(), 3..64),
        ) {
            let msg = encode_catalog(Level::Info, ModuleId(module), StringId(id), &args);
            let two = encode_catalog(Level::Info, ModuleId(module), StringId(id), &args[..2]);
            prop_assert!(matches!(msg, Message::Buffer(_)));
            prop_assert_eq!(msg.len(), 2 + args.len());
            prop_assert_eq!(&msg.words()[..2], &two.words()[..2]);
            prop_assert_eq!(&msg.words()[2..], &args[..]);
        }

        #[test]
        fn compact32_reconstructs(version in 0u64..(1 << 22)) {
            let msg = encode_build(version, None).unwrap();
            prop_assert_eq!(msg.len(), 1);
            let word = msg.words()[0] as u64;
            prop_assert_eq!(((word >> 10) & 0x30_0000) | ((word >> 4) & 0xf_ffff), version);
        }

        #[test]
        fn compact64_reconstructs(version in (1u64 << 22)..(1 << 54)) {
            let msg = encode_build(version, None).unwrap();
            prop_assert_eq!(msg.len(), 2);
            let (w0, w1) = (msg.words()[0] as u64, msg.words()[1] as u64);
            prop_assert_eq!((w0 >> 24) & 0xf, 1);
            let low = ((w0 >> 10) & 0x30_0000) | ((w0 >> 4) & 0xf_ffff);
            prop_assert_eq!(low | (w1 << 22), version);
        }

        #[test]
        fn long_form_reconstructs(
            version in any::<u64>(),
            text in prop::collection::vec(any::<u8>(), 0..256),
        ) {
            let msg = encode_build(version, Some(&text)).unwrap();
            let bytes = le_bytes(msg.words());
            prop_assert_eq!(msg.len(), (4 + 2 + 8 + text.len()).div_ceil(4));
            prop_assert_eq!(msg.words()[0], (2 << 24) | (1 << 9));
            prop_assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]) as usize, 8 + text.len());
            let mut ver = [0u8; 8];
            ver.copy_from_slice(&bytes[6..14]);
            prop_assert_eq!(u64::from_le_bytes(ver), version);
            prop_assert_eq!(&bytes[14..14 + text.len()], &text[..]);
        }

        #[test]
        fn wide_versions_use_long_form(version in (1u64 << 54)..=u64::MAX) {
            let msg = encode_build(version, None).unwrap();
            prop_assert_eq!(msg.len(), 4);
            let bytes = le_bytes(msg.words());
            prop_assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 8);
        }
    }
}
