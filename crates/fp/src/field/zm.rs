use std::{
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use super::Field;
use crate::{prime::pow_mod, FpError, Result};

/// The largest order `p^k` for which we are willing to build an inverse table.
pub const MAX_ORDER: u32 = 1 << 20;

/// The ring `Z/p^k`, with a precomputed table of inverses.
///
/// The table has one entry per residue class, so constructing the ring costs `O(p^k log p^k)`.
/// Cloning is cheap since the table is shared. Two rings compare equal if they have the same
/// modulus.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "ZmParams", into = "ZmParams")]
pub struct Zm {
    prime: u32,
    exponent: u32,
    order: u32,
    inverses: Arc<[u32]>,
}

#[derive(Serialize, Deserialize)]
struct ZmParams {
    prime: u32,
    exponent: u32,
}

impl Zm {
    /// Builds `Z/p^k`. The primality of `prime` is not checked; the inverse table is only
    /// meaningful if it is a prime.
    pub fn new(prime: u32, exponent: u32) -> Result<Self> {
        if prime < 2 || exponent == 0 {
            return Err(FpError::InvalidModulus { prime, exponent });
        }
        let order = prime
            .checked_pow(exponent)
            .filter(|&q| q <= MAX_ORDER)
            .ok_or(FpError::ModulusTooLarge {
                prime,
                exponent,
                max: MAX_ORDER,
            })?;

        // The units form a group of order p^k - p^(k-1), so a^(p^k - p^(k-1) - 1) is the
        // inverse of a unit a.
        let e = order - order / prime - 1;
        let inverses: Arc<[u32]> = (0..order)
            .map(|a| if a % prime == 0 { 0 } else { pow_mod(order, a, e) })
            .collect();

        tracing::debug!(prime, exponent, order, "built inverse table");

        Ok(Self {
            prime,
            exponent,
            order,
            inverses,
        })
    }

    pub fn prime(&self) -> u32 {
        self.prime
    }

    pub fn exponent(&self) -> u32 {
        self.exponent
    }

    /// The table of inverses, indexed by residue. Entries of non-units are zero.
    pub fn inverse_table(&self) -> &[u32] {
        &self.inverses
    }
}

impl Field for Zm {
    type Element = u32;

    fn characteristic(&self) -> u32 {
        self.prime
    }

    fn order(&self) -> u32 {
        self.order
    }

    fn is_field(&self) -> bool {
        self.exponent == 1
    }

    fn el(&self, n: i64) -> u32 {
        n.rem_euclid(self.order as i64) as u32
    }

    fn value(&self, a: u32) -> u32 {
        a
    }

    fn zero(&self) -> u32 {
        0
    }

    fn one(&self) -> u32 {
        // Z/1 is excluded by the constructor, so 1 is already reduced.
        1
    }

    fn add(&self, a: u32, b: u32) -> u32 {
        (a + b) % self.order
    }

    fn sub(&self, a: u32, b: u32) -> u32 {
        (a + self.order - b) % self.order
    }

    fn mul(&self, a: u32, b: u32) -> u32 {
        (a as u64 * b as u64 % self.order as u64) as u32
    }

    fn neg(&self, a: u32) -> u32 {
        (self.order - a) % self.order
    }

    fn inv(&self, a: u32) -> Option<u32> {
        match self.inverses[a as usize] {
            0 => None,
            a_inv => Some(a_inv),
        }
    }

    fn is_invertible(&self, a: u32) -> bool {
        a % self.prime != 0
    }
}

impl PartialEq for Zm {
    fn eq(&self, other: &Self) -> bool {
        self.prime == other.prime && self.exponent == other.exponent
    }
}

impl Eq for Zm {}

impl Hash for Zm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.prime.hash(state);
        self.exponent.hash(state);
    }
}

impl Debug for Zm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Zm")
            .field("prime", &self.prime)
            .field("exponent", &self.exponent)
            .finish_non_exhaustive()
    }
}

impl Display for Zm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.exponent == 1 {
            write!(f, "F_{}", self.prime)
        } else {
            write!(f, "Z/{}^{}", self.prime, self.exponent)
        }
    }
}

impl TryFrom<ZmParams> for Zm {
    type Error = FpError;

    fn try_from(params: ZmParams) -> Result<Self> {
        Self::new(params.prime, params.exponent)
    }
}

impl From<Zm> for ZmParams {
    fn from(zm: Zm) -> Self {
        Self {
            prime: zm.prime,
            exponent: zm.exponent,
        }
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use proptest::prelude::*;

    use super::*;
    use crate::field_tests;

    const MODULI: [(u32, u32); 7] = [(2, 1), (3, 1), (7, 1), (2, 3), (3, 2), (5, 2), (3, 4)];

    fn arb_elements<const N: usize>() -> impl Strategy<Value = (Zm, [u32; N])> {
        proptest::sample::select(MODULI.to_vec()).prop_flat_map(|(p, k)| {
            let f = Zm::new(p, k).unwrap();
            let order = f.order();
            (Just(f), proptest::array::uniform::<_, N>(0..order))
        })
    }

    field_tests!();

    #[test]
    fn inverse_table_mod_9() {
        let z9 = Zm::new(3, 2).unwrap();
        expect![["[0, 1, 5, 0, 7, 2, 0, 4, 8]"]].assert_eq(&format!("{:?}", z9.inverse_table()));
        assert!(!z9.is_field());
        assert!(z9.is_invertible(4));
        assert!(!z9.is_invertible(6));
    }

    #[test]
    fn rejects_bad_moduli() {
        assert_eq!(
            Zm::new(1, 3).unwrap_err(),
            FpError::InvalidModulus {
                prime: 1,
                exponent: 3
            }
        );
        assert_eq!(
            Zm::new(5, 0).unwrap_err(),
            FpError::InvalidModulus {
                prime: 5,
                exponent: 0
            }
        );
        assert!(matches!(
            Zm::new(2, 21),
            Err(FpError::ModulusTooLarge { .. })
        ));
        assert!(matches!(
            Zm::new(3, 40),
            Err(FpError::ModulusTooLarge { .. })
        ));
        assert!(Zm::new(2, 20).is_ok());
    }

    #[test]
    fn non_invertible_division() {
        let z8 = Zm::new(2, 3).unwrap();
        assert_eq!(z8.div(3, 2), 0);
        assert_eq!(
            z8.checked_div(3, 2),
            Err(FpError::DivisionByNonInvertible { value: 2, order: 8 })
        );
        assert_eq!(z8.div(6, 3), 2);
    }

    #[test]
    fn display() {
        assert_eq!(Zm::new(5, 1).unwrap().to_string(), "F_5");
        assert_eq!(Zm::new(3, 2).unwrap().to_string(), "Z/3^2");
        assert_eq!(format!("{:?}", Zm::new(3, 2).unwrap()), "Zm { prime: 3, exponent: 2, .. }");
    }

    #[test]
    fn serde() {
        let z = Zm::new(7, 2).unwrap();
        let json = serde_json::to_string(&z).unwrap();
        assert_eq!(json, r#"{"prime":7,"exponent":2}"#);
        let back: Zm = serde_json::from_str(&json).unwrap();
        assert_eq!(back, z);
        assert_eq!(back.inverse_table(), z.inverse_table());

        assert!(serde_json::from_str::<Zm>(r#"{"prime":7,"exponent":0}"#).is_err());
    }
}
