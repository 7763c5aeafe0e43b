use std::{
    fmt::{Debug, Display},
    hash::Hash,
    str::FromStr,
};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::FpError;

/// A prime number. Implemented by the static primes [`P2`], [`P3`], [`P5`], [`P7`] and by the
/// dynamic prime [`ValidPrime`].
///
/// A static prime is a zero-sized type whose `as_u32` is a constant, so a condition like `p ==
/// 2` is resolved at compile time, while the same code still works for primes chosen at runtime.
pub trait Prime:
    Debug
    + Clone
    + Copy
    + Display
    + Hash
    + PartialEq
    + Eq
    + Serialize
    + for<'de> Deserialize<'de>
    + Send
    + Sync
    + 'static
{
    fn as_u32(self) -> u32;
    fn to_dyn(self) -> ValidPrime;

    fn as_usize(self) -> usize {
        self.as_u32() as usize
    }

    /// Computes the sum mod p. This takes care of overflow.
    fn sum(self, n1: u32, n2: u32) -> u32 {
        ((n1 as u64 + n2 as u64) % self.as_u32() as u64) as u32
    }

    /// Computes the product mod p. This takes care of overflow.
    fn product(self, n1: u32, n2: u32) -> u32 {
        ((n1 as u64 * n2 as u64) % self.as_u32() as u64) as u32
    }

    fn pow_mod(self, b: u32, e: u32) -> u32 {
        pow_mod(self.as_u32(), b, e)
    }

    fn inverse(self, k: u32) -> u32 {
        inverse(self, k)
    }
}

/// Computes `b^e mod modulus` by repeated squaring.
pub fn pow_mod(modulus: u32, b: u32, mut e: u32) -> u32 {
    assert!(modulus > 0);
    let modulus = modulus as u64;
    let mut b = b as u64 % modulus;
    let mut result = 1 % modulus;
    while e > 0 {
        if e & 1 == 1 {
            result = result * b % modulus;
        }
        b = b * b % modulus;
        e >>= 1;
    }
    result as u32
}

/// Computes the inverse of `k` mod `p` using Fermat's little theorem. `k` must not be divisible
/// by `p`.
pub fn inverse<P: Prime>(p: P, k: u32) -> u32 {
    debug_assert!(k % p.as_u32() != 0, "{k} is not invertible mod {p}");
    p.pow_mod(k, p.as_u32() - 2)
}

pub const fn is_prime(p: u32) -> bool {
    if p < 2 {
        return false;
    }
    // (2..).take_while(|k| k * k <= p).all(|k| p % k != 0), but make it const
    let mut k = 2;
    while k * k <= p {
        if p % k == 0 {
            return false;
        }
        k += 1;
    }
    true
}

macro_rules! def_prime_static {
    ($pn:ident, $p:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $pn;

        impl Prime for $pn {
            #[inline]
            fn as_u32(self) -> u32 {
                $p
            }

            #[inline]
            fn to_dyn(self) -> ValidPrime {
                ValidPrime::new($p)
            }
        }

        impl Display for $pn {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                <u32 as Display>::fmt(&$p, f)
            }
        }

        impl TryFrom<u32> for $pn {
            type Error = FpError;

            fn try_from(value: u32) -> Result<Self, Self::Error> {
                if value == $p {
                    Ok($pn)
                } else {
                    Err(FpError::InvalidPrime(value))
                }
            }
        }

        impl Serialize for $pn {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.as_u32().serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $pn {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let p = u32::deserialize(deserializer)?;
                $pn::try_from(p).map_err(D::Error::custom)
            }
        }
    };
}

def_prime_static!(P2, 2);
def_prime_static!(P3, 3);
def_prime_static!(P5, 5);
def_prime_static!(P7, 7);

/// A prime chosen at runtime. Primality is checked on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidPrime {
    p: u32,
}

impl ValidPrime {
    /// # Panics
    /// If `p` is not a prime or does not fit in an `i32`.
    pub const fn new(p: u32) -> Self {
        assert!(p < (1 << 31), "Tried to construct a prime larger than 2^31");
        assert!(is_prime(p), "Tried to construct a composite dynamic prime");
        Self { p }
    }

    pub const fn new_unchecked(p: u32) -> Self {
        Self { p }
    }
}

impl Prime for ValidPrime {
    fn as_u32(self) -> u32 {
        self.p
    }

    fn to_dyn(self) -> Self {
        self
    }
}

impl Display for ValidPrime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        <u32 as Display>::fmt(&self.p, f)
    }
}

impl PartialEq<u32> for ValidPrime {
    fn eq(&self, other: &u32) -> bool {
        self.p == *other
    }
}

impl TryFrom<u32> for ValidPrime {
    type Error = FpError;

    fn try_from(p: u32) -> Result<Self, Self::Error> {
        if p < (1 << 31) && is_prime(p) {
            Ok(Self { p })
        } else {
            Err(FpError::InvalidPrime(p))
        }
    }
}

impl FromStr for ValidPrime {
    type Err = FpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let p: u32 = s.parse()?;
        Self::try_from(p)
    }
}

impl Serialize for ValidPrime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.p.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidPrime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let p = u32::deserialize(deserializer)?;
        Self::try_from(p).map_err(D::Error::custom)
    }
}

#[cfg(feature = "proptest")]
pub mod arbitrary {
    use proptest::prelude::*;

    use super::ValidPrime;

    pub const SMALL_PRIMES: [u32; 8] = [2, 3, 5, 7, 11, 13, 17, 19];

    pub fn arb_prime() -> impl Strategy<Value = ValidPrime> {
        proptest::sample::select(SMALL_PRIMES.to_vec()).prop_map(ValidPrime::new)
    }
}
