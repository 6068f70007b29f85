//! Compare-and-swap tokens
//!
//! Every read and write returns a `Cas`. Passing it back on a later write
//! makes that write conditional on no intervening modification.
//!
//! ## Zero
//!
//! `Cas::NONE` means "no CAS check". A missing or malformed CAS in metadata
//! coerces to `NONE`, which makes replace/touch/destroy unconditional.

use serde::{Deserialize, Serialize};

use crate::coerce::MetaValue;

/// Opaque compare-and-swap token issued by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cas(u64);

impl Cas {
    /// No CAS check
    pub const NONE: Cas = Cas(0);

    /// Wrap a raw token
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Cas(raw)
    }

    /// Raw token value
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Check if this is the "no CAS check" token
    #[inline]
    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Coerce a metadata value into a CAS token
    ///
    /// Accepts a `Cas`, any non-negative integer, and the legacy transports
    /// seen on stored documents: a decimal string or a float. Anything else
    /// (including negative numbers) is `None`.
    pub fn coerce(value: &MetaValue) -> Option<Cas> {
        match value {
            MetaValue::Cas(c) => Some(*c),
            MetaValue::UInt(u) => Some(Cas(*u)),
            MetaValue::Int(i) if *i >= 0 => Some(Cas(*i as u64)),
            MetaValue::Str(s) => s.trim().parse::<u64>().ok().map(Cas),
            MetaValue::Float(f) if f.is_finite() && *f >= 0.0 => Some(Cas(*f as u64)),
            MetaValue::Json(serde_json::Value::Number(n)) => n.as_u64().map(Cas),
            _ => None,
        }
    }
}

impl From<u64> for Cas {
    fn from(raw: u64) -> Self {
        Cas(raw)
    }
}

impl std::fmt::Display for Cas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cas:{}", self.0)
    }
}
