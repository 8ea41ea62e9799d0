use crate::{Point, Scalar};
use rand_core::{CryptoRng, RngCore};
use std::iter::Sum;
use std::ops::Add;

/// An ElGamal ciphertext `(g^r, y^r · M)` in additive notation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Ciphertext {
    pub alpha: Point,
    pub beta: Point,
}

impl Ciphertext {
    /// Encryption of the identity with no randomness, the neutral element for [`Add`].
    pub fn zero() -> Self {
        Ciphertext {
            alpha: Point::identity(),
            beta: Point::identity(),
        }
    }

    /// Encrypt the encoded plaintext `m` under `y` with randomness `r`.
    pub fn encrypt_point(y: &Point, m: &Point, r: &Scalar) -> Self {
        Ciphertext {
            alpha: Point::mul_base(r),
            beta: *y * *r + *m,
        }
    }

    /// Encrypt the small integer `m` (as `g^m`), returning the randomness used.
    pub fn encrypt<R: RngCore + CryptoRng>(rng: &mut R, y: &Point, m: u64) -> (Self, Scalar) {
        let r = Scalar::random(rng);
        (Ciphertext::encrypt_point(y, &Point::from_int(m), &r), r)
    }

    /// Add a fresh encryption of zero.
    pub fn reencrypt(&self, y: &Point, r: &Scalar) -> Self {
        *self + Ciphertext::encrypt_point(y, &Point::identity(), r)
    }

    /// Homomorphic scaling of the plaintext by `k`.
    pub fn scale(&self, k: &Scalar) -> Self {
        Ciphertext {
            alpha: self.alpha * *k,
            beta: self.beta * *k,
        }
    }

    /// Both components lie in the subgroup.
    ///
    /// The identity is allowed, since aggregated tallies can legitimately contain it.
    pub fn is_valid(&self) -> bool {
        self.alpha.is_in_group() && self.beta.is_in_group()
    }

    /// Remove the decryption factor `alpha^x` and return the encoded plaintext.
    pub fn decrypt_with_factor(&self, factor: &Point) -> Point {
        self.beta - *factor
    }
}

impl Add for Ciphertext {
    type Output = Ciphertext;
    fn add(self, rhs: Ciphertext) -> Ciphertext {
        Ciphertext {
            alpha: self.alpha + rhs.alpha,
            beta: self.beta + rhs.beta,
        }
    }
}

impl Sum for Ciphertext {
    fn sum<I: Iterator<Item = Ciphertext>>(iter: I) -> Ciphertext {
        iter.fold(Ciphertext::zero(), |acc, c| acc + c)
    }
}

impl<'a> Sum<&'a Ciphertext> for Ciphertext {
    fn sum<I: Iterator<Item = &'a Ciphertext>>(iter: I) -> Ciphertext {
        iter.fold(Ciphertext::zero(), |acc, c| acc + *c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn homomorphic_addition() {
        let mut rng = ChaCha20Rng::seed_from_u64(20);
        let x = Scalar::random(&mut rng);
        let y = Point::mul_base(&x);

        let (a, _) = Ciphertext::encrypt(&mut rng, &y, 2);
        let (b, _) = Ciphertext::encrypt(&mut rng, &y, 3);
        let sum: Ciphertext = vec![a, b].into_iter().sum();
        assert!(sum.is_valid());
        assert_eq!(sum.decrypt_with_factor(&(sum.alpha * x)), Point::from_int(5));

        let scaled = a.scale(&Scalar::from(4));
        assert_eq!(scaled.decrypt_with_factor(&(scaled.alpha * x)), Point::from_int(8));

        let r = Scalar::random(&mut rng);
        let re = a.reencrypt(&y, &r);
        assert_ne!(re, a);
        assert_eq!(re.decrypt_with_factor(&(re.alpha * x)), Point::from_int(2));
    }

    #[test]
    fn json_shape() {
        let c = Ciphertext {
            alpha: Point::generator(),
            beta: Point::from_int(2),
        };
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.starts_with("{\"alpha\":\"5866"));
        let back: Ciphertext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
