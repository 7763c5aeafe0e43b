use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{FpError, Result};

pub mod element;
pub mod fp;
pub mod zm;

pub use element::FieldElement;
pub use fp::Fp;
pub use zm::Zm;

/// A coefficient ring `Z/p^k`.
///
/// The ring is a value rather than global state: every operation on elements goes through it.
/// Elements are stored as their canonical representative in `[0, order)`; the methods of this
/// trait take and return such representatives and keep them normalized.
///
/// Rings that are not fields (`k > 1`) have non-zero elements without an inverse. For those,
/// [`Field::inv`] returns `None` and [`Field::div`] follows the convention that the inverse of a
/// non-invertible element is zero.
pub trait Field:
    Debug + Display + Clone + PartialEq + Eq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    type Element: Copy
        + Debug
        + Display
        + Default
        + PartialEq
        + Eq
        + Hash
        + Send
        + Sync
        + Serialize
        + DeserializeOwned;

    /// The prime `p`.
    fn characteristic(&self) -> u32;

    /// The number of elements `p^k`.
    fn order(&self) -> u32;

    fn is_field(&self) -> bool;

    /// The residue class of an arbitrary integer.
    fn el(&self, n: i64) -> Self::Element;

    /// The canonical representative of `a` in `[0, order)`.
    fn value(&self, a: Self::Element) -> u32;

    fn zero(&self) -> Self::Element;
    fn one(&self) -> Self::Element;

    fn add(&self, a: Self::Element, b: Self::Element) -> Self::Element;
    fn sub(&self, a: Self::Element, b: Self::Element) -> Self::Element;
    fn mul(&self, a: Self::Element, b: Self::Element) -> Self::Element;
    fn neg(&self, a: Self::Element) -> Self::Element;

    /// The multiplicative inverse, or `None` if `a` is not a unit.
    fn inv(&self, a: Self::Element) -> Option<Self::Element>;

    fn is_zero(&self, a: Self::Element) -> bool {
        a == self.zero()
    }

    fn is_invertible(&self, a: Self::Element) -> bool {
        self.inv(a).is_some()
    }

    /// Computes `a / b`. If `b` is not invertible the result is zero.
    fn div(&self, a: Self::Element, b: Self::Element) -> Self::Element {
        match self.inv(b) {
            Some(b_inv) => self.mul(a, b_inv),
            None => self.zero(),
        }
    }

    fn checked_div(&self, a: Self::Element, b: Self::Element) -> Result<Self::Element> {
        let b_inv = self.inv(b).ok_or(FpError::DivisionByNonInvertible {
            value: self.value(b),
            order: self.order(),
        })?;
        Ok(self.mul(a, b_inv))
    }

    /// Wraps the residue class of `n` together with a reference to this ring, so that it can be
    /// used with the usual arithmetic operators.
    fn element(&self, n: i64) -> FieldElement<'_, Self> {
        FieldElement::new(self, self.el(n))
    }

    fn wrap(&self, a: Self::Element) -> FieldElement<'_, Self> {
        FieldElement::new(self, a)
    }
}

/// Generates the ring axiom tests for a field. The caller must have a function `arb_elements<const
/// N: usize>()` in scope that produces a strategy for a ring together with `N` elements of it.
#[cfg(test)]
#[macro_export]
macro_rules! field_tests {
    () => {
        proptest! {
            #[test]
            fn test_addition_is_commutative((f, [a, b]) in arb_elements::<2>()) {
                prop_assert_eq!(f.add(a, b), f.add(b, a));
            }

            #[test]
            fn test_addition_is_associative((f, [a, b, c]) in arb_elements::<3>()) {
                prop_assert_eq!(f.add(f.add(a, b), c), f.add(a, f.add(b, c)));
            }

            #[test]
            fn test_negation_is_additive_inverse((f, [a]) in arb_elements::<1>()) {
                prop_assert_eq!(f.add(a, f.neg(a)), f.zero());
                prop_assert_eq!(f.sub(a, a), f.zero());
            }

            #[test]
            fn test_multiplication_distributes((f, [a, b, c]) in arb_elements::<3>()) {
                prop_assert_eq!(
                    f.mul(a, f.add(b, c)),
                    f.add(f.mul(a, b), f.mul(a, c))
                );
            }

            #[test]
            fn test_inverse((f, [a]) in arb_elements::<1>()) {
                match f.inv(a) {
                    Some(a_inv) => prop_assert_eq!(f.mul(a, a_inv), f.one()),
                    None => prop_assert_eq!(f.value(a) % f.characteristic(), 0),
                }
            }

            #[test]
            fn test_division((f, [a, b]) in arb_elements::<2>()) {
                if f.is_invertible(b) {
                    prop_assert_eq!(f.mul(f.div(a, b), b), a);
                    prop_assert_eq!(f.checked_div(a, b), Ok(f.div(a, b)));
                } else {
                    prop_assert_eq!(f.div(a, b), f.zero());
                    prop_assert!(f.checked_div(a, b).is_err());
                }
            }

            #[test]
            fn test_values_are_normalized((f, [a, b]) in arb_elements::<2>()) {
                for x in [f.add(a, b), f.sub(a, b), f.mul(a, b), f.neg(a)] {
                    prop_assert!(f.value(x) < f.order());
                }
            }
        }
    };
}
