//! WebId arithmetic.
//!
//! A node's identifier is a plain integer whose binary representation is its
//! corner in the hypercube it anchors. A node of height `h` always has an
//! identifier below `2^h`, so every relation can be computed by flipping,
//! clearing or complementing bits inside that window.

use std::fmt;

/// Identifier of a node in the web.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebId(pub u64);

impl WebId {
    /// The bootstrap node.
    pub const ZERO: Self = Self(0);

    /// Create from a raw identifier.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Number of bits needed to write this identifier (0 for the origin).
    #[inline]
    pub const fn bit_length(&self) -> u32 {
        u64::BITS - self.0.leading_zeros()
    }

    /// Mask of the highest set bit, if any.
    #[inline]
    pub const fn highest_bit(&self) -> Option<u64> {
        if self.0 == 0 {
            None
        } else {
            Some(1 << (self.bit_length() - 1))
        }
    }

    /// Parent identifier: this one with its highest set bit cleared.
    ///
    /// The origin has no parent.
    pub const fn parent(&self) -> Option<Self> {
        match self.highest_bit() {
            Some(bit) => Some(Self(self.0 & !bit)),
            None => None,
        }
    }

    /// Identifier of the child a node of `height` would create.
    #[inline]
    pub const fn child(&self, height: u32) -> Self {
        Self(self.0 | (1 << height))
    }

    /// Bitwise complement inside a window of `height` bits.
    #[inline]
    pub const fn complement(&self, height: u32) -> Self {
        Self(!self.0 & mask(height))
    }

    /// Number of differing bits.
    #[inline]
    pub const fn hamming(&self, other: Self) -> u32 {
        (self.0 ^ other.0).count_ones()
    }

    /// Number of equal bits inside a window of `window` low bits.
    #[inline]
    pub const fn matching_bits(&self, other: Self, window: u32) -> u32 {
        window - ((self.0 ^ other.0) & mask(window)).count_ones()
    }

    /// Trailing zero bits, capped at `limit` (the origin has no set bit).
    #[inline]
    pub const fn trailing_zeros(&self, limit: u32) -> u32 {
        let tz = self.0.trailing_zeros();
        if tz < limit {
            tz
        } else {
            limit
        }
    }
}

/// Mask of the low `bits` bits.
#[inline]
pub const fn mask(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

impl From<u64> for WebId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<WebId> for u64 {
    fn from(value: WebId) -> Self {
        value.0
    }
}

impl fmt::Display for WebId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Binary for WebId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}
