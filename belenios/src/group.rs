//! Elements of the prime-order subgroup of the Ed25519 curve.
//!
//! The wire format is the lowercase hex of the 32-byte compressed Edwards-Y encoding. That
//! encoding is little-endian, so the hex string is the byte-reversal of the natural big-endian
//! rendering of the point.

use crate::{sha256, Error, Scalar};
use curve25519_dalek::constants::{ED25519_BASEPOINT_POINT, ED25519_BASEPOINT_TABLE};
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use curve25519_dalek::traits::{Identity, IsIdentity, VartimeMultiscalarMul};
use num::BigUint;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

/// Name of the group, as it appears in election parameters and proof prefixes.
pub const GROUP_NAME: &str = "Ed25519";

/// Low bits left free by [`Point::encode_small_int`] for the point search.
const SEARCH_BITS: usize = 8;

/// Largest byte string [`Point::encode_small_int`] can map onto the curve.
pub const MAX_ENCODED_BYTES: usize = 30;

/// Attempts made by [`Point::derive_generator`] before giving up.
const GENERATOR_ATTEMPTS: usize = 1024;

/// A point on Ed25519.
///
/// Deserialization only guarantees a canonically encoded curve point. Membership in the
/// prime-order subgroup is checked with [`Point::is_valid`] at each use site.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Point(pub(crate) EdwardsPoint);

impl Point {
    pub fn generator() -> Self {
        Point(ED25519_BASEPOINT_POINT)
    }

    pub fn identity() -> Self {
        Point(EdwardsPoint::identity())
    }

    /// `g^x`
    pub fn mul_base(x: &Scalar) -> Self {
        Point(&x.0 * &ED25519_BASEPOINT_TABLE)
    }

    /// `g^n`, the encoding of a small homomorphic plaintext.
    pub fn from_int(n: u64) -> Self {
        Point::mul_base(&Scalar::from(n))
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_identity()
    }

    /// Lies in the prime-order subgroup. The identity is accepted.
    pub fn is_in_group(&self) -> bool {
        self.0.is_torsion_free()
    }

    /// Lies in the prime-order subgroup and is not the identity.
    pub fn is_valid(&self) -> bool {
        self.is_in_group() && !self.is_identity()
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != 32 {
            return Err(Error::MalformedPoint(hex::encode(bytes)));
        }
        let compressed = CompressedEdwardsY::from_slice(bytes);
        let point = compressed
            .decompress()
            .ok_or_else(|| Error::MalformedPoint(hex::encode(bytes)))?;
        if point.compress() != compressed {
            return Err(Error::NonCanonicalPoint(hex::encode(bytes)));
        }
        Ok(Point(point))
    }

    /// `Π points[i]^scalars[i]`, in variable time. Only for public data.
    pub fn multi_mul(scalars: &[Scalar], points: &[Point]) -> Self {
        Point(EdwardsPoint::vartime_multiscalar_mul(
            scalars.iter().map(|s| s.0),
            points.iter().map(|p| p.0),
        ))
    }

    /// Map a short byte string onto a subgroup element.
    ///
    /// The bytes are read as a big-endian integer and shifted left by eight bits; the freed
    /// low bits are probed in order until the candidate decodes to a valid point.
    pub fn encode_small_int(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() > MAX_ENCODED_BYTES {
            return Err(Error::InvalidPlaintext(format!(
                "{} bytes exceeds the maximum of {}",
                bytes.len(),
                MAX_ENCODED_BYTES
            )));
        }
        let base = BigUint::from_bytes_be(bytes) << SEARCH_BITS;
        let attempts = 1usize << SEARCH_BITS;
        for k in 0..attempts {
            let candidate = &base + BigUint::from(k);
            if let Some(point) = decode_y(&candidate) {
                if point.is_valid() {
                    return Ok(point);
                }
            }
        }
        Err(Error::NoValidPoint(attempts))
    }

    /// Inverse of [`Point::encode_small_int`].
    pub fn decode_small_int(&self) -> Vec<u8> {
        let y = BigUint::from_bytes_le(&self.to_bytes()) >> SEARCH_BITS;
        if y == BigUint::from(0u32) {
            return vec![];
        }
        y.to_bytes_be()
    }

    /// Deterministically derive an auxiliary generator with unknown discrete log.
    pub fn derive_generator(i: usize) -> Result<Self, Error> {
        let digest = sha256(format!("ggen|{}", i).as_bytes());
        let base = BigUint::from_bytes_be(&digest);
        for k in 0..GENERATOR_ATTEMPTS {
            let candidate = &base + BigUint::from(k);
            if let Some(point) = decode_y(&candidate) {
                let point = Point(point.0.mul_by_cofactor());
                if !point.is_identity() {
                    return Ok(point);
                }
            }
        }
        Err(Error::NoValidPoint(GENERATOR_ATTEMPTS))
    }

    /// Smallest `n <= bound` with `g^n == self`.
    pub fn discrete_log(&self, bound: u64) -> Result<u64, Error> {
        let g = Point::generator();
        let mut acc = Point::identity();
        for n in 0..=bound {
            if acc == *self {
                return Ok(n);
            }
            acc = acc + g;
        }
        Err(Error::DiscreteLogNotFound(bound))
    }
}

/// Decode the low 255 bits of `y` as a compressed point with sign bit zero.
fn decode_y(y: &BigUint) -> Option<Point> {
    let le = y.to_bytes_le();
    let mut bytes = [0u8; 32];
    let len = le.len().min(32);
    bytes[..len].copy_from_slice(&le[..len]);
    bytes[31] &= 0x7f;
    CompressedEdwardsY(bytes).decompress().map(Point)
}

/// Check that all generators are pairwise distinct.
pub fn check_distinct(generators: &[Point]) -> Result<(), Error> {
    let mut seen = std::collections::HashMap::with_capacity(generators.len());
    for (i, g) in generators.iter().enumerate() {
        if let Some(j) = seen.insert(g.to_bytes(), i) {
            return Err(Error::GeneratorCollision(j, i));
        }
    }
    Ok(())
}

impl FromStr for Point {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 || s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(Error::MalformedPoint(s.to_owned()));
        }
        let bytes = hex::decode(s)?;
        Point::from_bytes(&bytes)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Point({})", self.to_hex())
    }
}

impl Default for Point {
    fn default() -> Self {
        Point::identity()
    }
}

impl Serialize for Point {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Point {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point(self.0 + rhs.0)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point(self.0 - rhs.0)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point(-self.0)
    }
}

impl Mul<Scalar> for Point {
    type Output = Point;
    fn mul(self, rhs: Scalar) -> Point {
        Point(self.0 * rhs.0)
    }
}

impl Sum for Point {
    fn sum<I: Iterator<Item = Point>>(iter: I) -> Point {
        iter.fold(Point::identity(), |acc, p| acc + p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn serialization_round_trip() {
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        for _ in 0..20 {
            let p = Point::mul_base(&Scalar::random(&mut rng));
            let hex = p.to_hex();
            let parsed: Point = hex.parse().unwrap();
            assert_eq!(parsed.to_hex(), hex);
            assert!(parsed.is_valid());
        }
    }

    #[test]
    fn generator_wire_format_is_little_endian() {
        // The compressed base point is y = 4/5, whose little-endian encoding starts with 0x58.
        assert_eq!(
            Point::generator().to_hex(),
            "5866666666666666666666666666666666666666666666666666666666666666"
        );
    }

    #[test]
    fn rejects_malformed_encodings() {
        assert!("zz".parse::<Point>().is_err());
        let hex = Point::mul_base(&Scalar::from(2u64)).to_hex();
        let upper = hex.to_uppercase();
        assert_ne!(upper, hex);
        assert!(upper.parse::<Point>().is_err());
        assert!(hex.parse::<Point>().is_ok());
        assert!(Point::from_bytes(&[0u8; 31]).is_err());
        // y = 2 is not on the curve
        let mut off_curve = [0u8; 32];
        off_curve[0] = 2;
        assert!(Point::from_bytes(&off_curve).is_err());
        // y = p decodes like y = 0 but is not the canonical encoding
        let mut unreduced = [0xffu8; 32];
        unreduced[0] = 0xed;
        unreduced[31] = 0x7f;
        assert!(matches!(
            Point::from_bytes(&unreduced),
            Err(Error::NonCanonicalPoint(_))
        ));
    }

    #[test]
    fn validity_excludes_identity_and_torsion() {
        assert!(!Point::identity().is_valid());
        assert!(Point::identity().is_in_group());
        // (0, -1) has order 2
        let mut order_two = [0u8; 32];
        order_two[0] = 0xec;
        for b in order_two.iter_mut().take(31).skip(1) {
            *b = 0xff;
        }
        order_two[31] = 0x7f;
        let p = Point::from_bytes(&order_two).unwrap();
        assert!(!p.is_in_group());
    }

    #[test]
    fn small_int_encoding_is_invertible() {
        for bytes in &[vec![], vec![1u8], vec![0x12, 0x34], b"hello world".to_vec()] {
            let p = Point::encode_small_int(bytes).unwrap();
            assert!(p.is_valid());
            assert_eq!(&p.decode_small_int(), bytes);
        }
        assert!(Point::encode_small_int(&[1u8; 31]).is_err());
    }

    #[test]
    fn derived_generators_are_valid_and_distinct() {
        let generators: Vec<Point> = (0..16).map(|i| Point::derive_generator(i).unwrap()).collect();
        assert!(generators.iter().all(Point::is_valid));
        check_distinct(&generators).unwrap();
        assert!(check_distinct(&[generators[0], generators[1], generators[0]]).is_err());
    }

    #[test]
    fn discrete_log_recovers_small_values() {
        assert_eq!(Point::identity().discrete_log(10).unwrap(), 0);
        assert_eq!(Point::from_int(7).discrete_log(10).unwrap(), 7);
        assert!(Point::from_int(11).discrete_log(10).is_err());
    }

    #[test]
    fn multi_mul_matches_naive() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let scalars: Vec<Scalar> = (0..5).map(|_| Scalar::random(&mut rng)).collect();
        let points: Vec<Point> = (0..5)
            .map(|_| Point::mul_base(&Scalar::random(&mut rng)))
            .collect();
        let naive: Point = scalars.iter().zip(&points).map(|(s, p)| *p * *s).sum();
        assert_eq!(Point::multi_mul(&scalars, &points), naive);
    }
}
