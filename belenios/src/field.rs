//! Arithmetic in the scalar field of the Ed25519 prime-order subgroup.
//!
//! Scalars travel on the wire as the decimal string of their residue in `[0, L)`.

use crate::Error;
use curve25519_dalek::scalar::Scalar as DalekScalar;
use num::BigUint;
use rand_core::{CryptoRng, RngCore};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::{Product, Sum};
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// Decimal representation of the subgroup order `L = 2^252 + 27742317777372353535851937790883648493`.
pub const GROUP_ORDER: &str =
    "7237005577332262213973186563042994240857116359379907606001950938285454250989";

/// An integer modulo the group order, always reduced.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Scalar(pub(crate) DalekScalar);

impl Scalar {
    pub fn zero() -> Self {
        Scalar(DalekScalar::zero())
    }

    pub fn one() -> Self {
        Scalar(DalekScalar::one())
    }

    /// Sample uniformly from `[0, L)`.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Scalar(DalekScalar::random(rng))
    }

    /// Reduce a big-endian byte string of any length modulo `L`.
    pub fn reduce_be(bytes: &[u8]) -> Self {
        let n = BigUint::from_bytes_be(bytes) % order();
        Scalar::from_biguint(&n)
    }

    /// Reduce 64 little-endian bytes modulo `L`.
    pub fn reduce_wide(bytes: &[u8; 64]) -> Self {
        Scalar(DalekScalar::from_bytes_mod_order_wide(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == DalekScalar::zero()
    }

    /// Multiplicative inverse. The inverse of zero is zero.
    pub fn invert(&self) -> Self {
        Scalar(self.0.invert())
    }

    pub fn pow(&self, mut exp: u64) -> Self {
        let mut base = *self;
        let mut acc = Scalar::one();
        while exp > 0 {
            if exp & 1 == 1 {
                acc = acc * base;
            }
            base = base * base;
            exp >>= 1;
        }
        acc
    }

    pub(crate) fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_le(self.0.as_bytes())
    }

    /// `n` must already be below `L`.
    fn from_biguint(n: &BigUint) -> Self {
        let mut bytes = [0u8; 32];
        let le = n.to_bytes_le();
        bytes[..le.len()].copy_from_slice(&le);
        Scalar(DalekScalar::from_bytes_mod_order(bytes))
    }
}

pub(crate) fn order() -> BigUint {
    // The constant is a valid decimal literal
    BigUint::parse_bytes(GROUP_ORDER.as_bytes(), 10).unwrap_or_default()
}

impl From<u64> for Scalar {
    fn from(x: u64) -> Self {
        Scalar(DalekScalar::from(x))
    }
}

impl FromStr for Scalar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::MalformedScalar(s.to_owned()));
        }
        let n = BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or_else(|| Error::MalformedScalar(s.to_owned()))?;
        if n >= order() {
            return Err(Error::MalformedScalar(s.to_owned()));
        }
        Ok(Scalar::from_biguint(&n))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Scalar({})", self)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Add for Scalar {
    type Output = Scalar;
    fn add(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 + rhs.0)
    }
}

impl Sub for Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 - rhs.0)
    }
}

impl Mul for Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 * rhs.0)
    }
}

impl Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

impl Sum for Scalar {
    fn sum<I: Iterator<Item = Scalar>>(iter: I) -> Scalar {
        iter.fold(Scalar::zero(), |acc, x| acc + x)
    }
}

impl Product for Scalar {
    fn product<I: Iterator<Item = Scalar>>(iter: I) -> Scalar {
        iter.fold(Scalar::one(), |acc, x| acc * x)
    }
}

/// Lagrange coefficient at zero for the share at `indexes[position]`.
///
/// `λ_j = Π_{k≠j} idx_k / (idx_k - idx_j)`. Indexes must be distinct and non-zero.
pub fn lagrange_coefficient(indexes: &[usize], position: usize) -> Scalar {
    let j = Scalar::from(indexes[position] as u64);
    let mut numerator = Scalar::one();
    let mut denominator = Scalar::one();
    for (k, idx) in indexes.iter().enumerate() {
        if k == position {
            continue;
        }
        let idx = Scalar::from(*idx as u64);
        numerator = numerator * idx;
        denominator = denominator * (idx - j);
    }
    numerator * denominator.invert()
}
