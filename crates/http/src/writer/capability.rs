use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use tracing::trace;

use crate::writer::ResponseWriter;

/// One optional capability of a transport writer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    ReadFrom,
    StringWriter,
    Flush,
    Hijack,
    CloseNotify,
}

impl Capability {
    pub const ALL: [Capability; 5] =
        [Capability::ReadFrom, Capability::StringWriter, Capability::Flush, Capability::Hijack, Capability::CloseNotify];

    /// bitmap = (read from, string writer, flush, hijack, close notify)
    #[inline]
    const fn bit(self) -> u8 {
        match self {
            Capability::ReadFrom => 1 << 4,
            Capability::StringWriter => 1 << 3,
            Capability::Flush => 1 << 2,
            Capability::Hijack => 1 << 1,
            Capability::CloseNotify => 1,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ReadFrom => "read from",
            Capability::StringWriter => "string write",
            Capability::Flush => "flush",
            Capability::Hijack => "hijack",
            Capability::CloseNotify => "close notify",
        };
        f.write_str(name)
    }
}

/// The set of optional capabilities a concrete writer type exposes.
///
/// There are 2^5 possible sets; [`index`](Capabilities::index) maps a set to its slot in
/// that table.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

const MASK: u8 = 0b1_1111;

static CAPABILITY_CACHE: Lazy<ArcSwap<HashMap<TypeId, Capabilities>>> =
    Lazy::new(|| ArcSwap::from_pointee(HashMap::new()));

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);
    pub const ALL: Capabilities = Capabilities(MASK);

    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & MASK)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// Asks the writer which capabilities it supports, bypassing the cache.
    pub fn probe(writer: &mut dyn ResponseWriter) -> Self {
        let mut capabilities = Self::NONE;
        if writer.as_reader_from().is_some() {
            capabilities = capabilities.with(Capability::ReadFrom);
        }
        if writer.as_string_writer().is_some() {
            capabilities = capabilities.with(Capability::StringWriter);
        }
        if writer.as_flusher().is_some() {
            capabilities = capabilities.with(Capability::Flush);
        }
        if writer.as_hijacker().is_some() {
            capabilities = capabilities.with(Capability::Hijack);
        }
        if writer.as_close_notifier().is_some() {
            capabilities = capabilities.with(Capability::CloseNotify);
        }
        capabilities
    }

    /// Returns the capabilities of `W`, probing `writer` only the first time the type is seen.
    ///
    /// The cache is a copy-on-write map: readers load the current snapshot without locking,
    /// a miss publishes a new map containing the old entries plus the new one. Two requests
    /// racing on the same new type both probe, and both publish the same answer.
    pub fn of<W: ResponseWriter>(writer: &mut W) -> Self {
        let type_id = TypeId::of::<W>();
        if let Some(capabilities) = CAPABILITY_CACHE.load().get(&type_id) {
            return *capabilities;
        }

        let capabilities = Self::probe(writer);
        trace!(writer = type_name::<W>(), bitmap = format_args!("{:05b}", capabilities.bits()), "probed writer capabilities");

        CAPABILITY_CACHE.rcu(|cache| {
            let mut next = HashMap::clone(cache);
            next.insert(type_id, capabilities);
            next
        });
        capabilities
    }

    /// The cached capabilities of `W`, if a writer of this type was seen before.
    pub fn cached<W: ResponseWriter>() -> Option<Self> {
        CAPABILITY_CACHE.load().get(&TypeId::of::<W>()).copied()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities(")?;
        let mut first = true;
        for capability in self.iter() {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{capability}")?;
            first = false;
        }
        write!(f, ")")
    }
}
