//! 128-bit content fingerprints for incremental up-to-date checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the two radix-36 halves of the human-readable form.
pub const HALF_SEPARATOR: char = '.';

/// A 128-bit content fingerprint computed with XXH3-128.
///
/// Stored as 16 bytes: the low 8-byte half followed by the high 8-byte half,
/// each little-endian. Two tables with equal fingerprints are assumed to have
/// identical content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Computes a fingerprint from a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self::from_u128(xxhash_rust::xxh3::xxh3_128(data))
    }

    /// Wraps a raw 128-bit hash value.
    pub fn from_u128(value: u128) -> Self {
        Self(value.to_le_bytes())
    }

    /// Builds a fingerprint from its two 64-bit halves.
    pub fn from_halves(low: u64, high: u64) -> Self {
        Self::from_u128((u128::from(high) << 64) | u128::from(low))
    }

    /// Reconstructs a fingerprint from its 16-byte machine-readable form.
    pub fn from_raw(raw: [u8; 16]) -> Self {
        Self(raw)
    }

    /// Returns the 16-byte machine-readable form (two little-endian halves).
    pub fn to_raw(self) -> [u8; 16] {
        self.0
    }

    /// Returns the full 128-bit value.
    pub fn as_u128(self) -> u128 {
        u128::from_le_bytes(self.0)
    }

    /// The low 64-bit half.
    pub fn low(self) -> u64 {
        self.as_u128() as u64
    }

    /// The high 64-bit half.
    pub fn high(self) -> u64 {
        (self.as_u128() >> 64) as u64
    }
}

/// Folds a sequence of values into one fingerprint with streaming XXH3-128.
///
/// The fold is order-sensitive: feeding the same parts in a different order
/// yields a different fingerprint.
pub struct FingerprintBuilder {
    state: xxhash_rust::xxh3::Xxh3,
}

impl FingerprintBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            state: xxhash_rust::xxh3::Xxh3::new(),
        }
    }

    /// Feeds raw bytes.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.state.update(bytes);
        self
    }

    /// Feeds another fingerprint in its raw form.
    pub fn fingerprint(&mut self, part: Fingerprint) -> &mut Self {
        self.update(&part.0)
    }

    /// Feeds a `u64` in little-endian form.
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    /// Finishes the fold.
    pub fn finish(&self) -> Fingerprint {
        Fingerprint::from_u128(self.state.digest128())
    }
}

impl Default for FingerprintBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{HALF_SEPARATOR}{}",
            to_radix36(self.low()),
            to_radix36(self.high())
        )
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Error returned when parsing the human-readable fingerprint form fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fingerprint `{input}`")]
pub struct ParseFingerprintError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for Fingerprint {
    type Err = ParseFingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFingerprintError {
            input: s.to_string(),
        };
        let (low, high) = s.split_once(HALF_SEPARATOR).ok_or_else(err)?;
        let low = u64::from_str_radix(low, 36).map_err(|_| err())?;
        let high = u64::from_str_radix(high, 36).map_err(|_| err())?;
        Ok(Self::from_halves(low, high))
    }
}

fn to_radix36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = Fingerprint::from_bytes(b"declarations");
        let b = Fingerprint::from_bytes(b"declarations");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = Fingerprint::from_bytes(b"types");
        let b = Fingerprint::from_bytes(b"typez");
        assert_ne!(a, b);
    }

    #[test]
    fn raw_form_is_two_le_halves() {
        let fp = Fingerprint::from_halves(0x0102030405060708, 0x1112131415161718);
        let raw = fp.to_raw();
        assert_eq!(&raw[..8], &0x0102030405060708u64.to_le_bytes());
        assert_eq!(&raw[8..], &0x1112131415161718u64.to_le_bytes());
        assert_eq!(Fingerprint::from_raw(raw), fp);
    }

    #[test]
    fn display_is_radix36_pair() {
        let fp = Fingerprint::from_halves(35, 36);
        assert_eq!(fp.to_string(), "z.10");
        let zero = Fingerprint::from_halves(0, u64::MAX);
        assert_eq!(zero.to_string(), "0.3w5e11264sgsf");
    }

    #[test]
    fn parse_display_form() {
        let fp = Fingerprint::from_bytes(b"strings");
        let parsed: Fingerprint = fp.to_string().parse().unwrap();
        assert_eq!(parsed, fp);
        assert!("no-separator".parse::<Fingerprint>().is_err());
        assert!("zz.!!".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn builder_is_order_sensitive() {
        let a = Fingerprint::from_bytes(b"a");
        let b = Fingerprint::from_bytes(b"b");
        let ab = FingerprintBuilder::new().fingerprint(a).fingerprint(b).finish();
        let ba = FingerprintBuilder::new().fingerprint(b).fingerprint(a).finish();
        let ab_again = FingerprintBuilder::new().fingerprint(a).fingerprint(b).finish();
        assert_ne!(ab, ba);
        assert_eq!(ab, ab_again);
    }

    #[test]
    fn serde_roundtrip() {
        let fp = Fingerprint::from_bytes(b"serde test");
        let json = serde_json::to_string(&fp).unwrap();
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, back);
    }
}
