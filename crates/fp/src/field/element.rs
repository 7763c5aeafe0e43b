use std::{
    fmt::{Debug, Display},
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use super::Field;
use crate::Result;

/// An element of a coefficient ring, bundled with the ring it lives in.
///
/// Matrices store bare `F::Element`s; this wrapper exists so that scalar code can be written with
/// the usual operators. Combining elements of different rings is a logic error and is caught by a
/// debug assertion.
pub struct FieldElement<'a, F: Field> {
    field: &'a F,
    value: F::Element,
}

// Derives would require `F: Copy`.
impl<F: Field> Clone for FieldElement<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: Field> Copy for FieldElement<'_, F> {}

impl<'a, F: Field> FieldElement<'a, F> {
    pub(crate) fn new(field: &'a F, value: F::Element) -> Self {
        Self { field, value }
    }

    pub fn field(&self) -> &'a F {
        self.field
    }

    pub fn val(self) -> F::Element {
        self.value
    }

    pub fn is_zero(self) -> bool {
        self.field.is_zero(self.value)
    }

    pub fn is_invertible(self) -> bool {
        self.field.is_invertible(self.value)
    }

    /// The inverse, or zero if `self` is not a unit.
    pub fn inverse(self) -> Self {
        let inv = self.field.inv(self.value).unwrap_or(self.field.zero());
        Self::new(self.field, inv)
    }

    pub fn checked_inverse(self) -> Option<Self> {
        self.field.inv(self.value).map(|inv| Self::new(self.field, inv))
    }

    pub fn checked_div(self, rhs: Self) -> Result<Self> {
        let value = self.field.checked_div(self.value, rhs.value)?;
        Ok(Self::new(self.field, value))
    }

    fn check_field(self, other: Self) {
        debug_assert_eq!(
            self.field, other.field,
            "combining elements of different rings"
        );
    }
}

impl<F: Field> Debug for FieldElement<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} in {}", self.value, self.field)
    }
}

impl<F: Field> Display for FieldElement<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl<F: Field> PartialEq for FieldElement<'_, F> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.value == other.value
    }
}

impl<F: Field> Eq for FieldElement<'_, F> {}

/// Compares residues, so `element == -1` holds for the largest representative.
impl<F: Field> PartialEq<i64> for FieldElement<'_, F> {
    fn eq(&self, other: &i64) -> bool {
        self.value == self.field.el(*other)
    }
}

impl<F: Field> From<FieldElement<'_, F>> for bool {
    fn from(a: FieldElement<'_, F>) -> Self {
        !a.is_zero()
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:ident) => {
        impl<'a, F: Field> $trait for FieldElement<'a, F> {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                self.check_field(rhs);
                Self::new(self.field, self.field.$op(self.value, rhs.value))
            }
        }

        impl<'a, F: Field> $assign_trait for FieldElement<'a, F> {
            fn $assign_method(&mut self, rhs: Self) {
                *self = $trait::$method(*self, rhs);
            }
        }
    };
}

impl_binary_op!(Add, add, AddAssign, add_assign, add);
impl_binary_op!(Sub, sub, SubAssign, sub_assign, sub);
impl_binary_op!(Mul, mul, MulAssign, mul_assign, mul);
impl_binary_op!(Div, div, DivAssign, div_assign, div);

impl<'a, F: Field> Mul<i64> for FieldElement<'a, F> {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self {
        let rhs = self.field.el(rhs);
        Self::new(self.field, self.field.mul(self.value, rhs))
    }
}

impl<'a, F: Field> Neg for FieldElement<'a, F> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(self.field, self.field.neg(self.value))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        field::{Field, Fp, Zm},
        prime::P7,
    };

    #[test]
    fn operators() {
        let z = Zm::new(3, 2).unwrap();
        let a = z.element(5);
        let b = z.element(-4);

        assert_eq!(b, 5);
        assert_eq!(a + b, 1);
        assert_eq!(a - b, 0);
        assert_eq!(a * b, 7);
        assert_eq!(-a, 4);
        assert_eq!(a * 2, 1);
        assert_eq!(a.inverse(), 2);
        assert_eq!(a / z.element(2), 7);

        let mut c = a;
        c += b;
        c *= z.element(3);
        assert_eq!(c, 3);
        c /= z.element(3);
        assert_eq!(c, 0);
        assert!(!bool::from(c));
        assert!(bool::from(a));
    }

    #[test]
    fn non_units() {
        let z = Zm::new(3, 2).unwrap();
        let six = z.element(6);
        assert!(!six.is_invertible());
        assert!(six.checked_inverse().is_none());
        assert_eq!(six.inverse(), 0);
        assert_eq!(z.element(4) / six, 0);
        assert!(z.element(4).checked_div(six).is_err());
    }

    #[test]
    fn prime_field() {
        let f = Fp::new(P7);
        for n in 1..7 {
            let a = f.element(n);
            assert_eq!(a * a.inverse(), 1);
        }
        assert_eq!(f.element(3).to_string(), "3");
        assert_eq!(format!("{:?}", f.element(10)), "3 in F_7");
    }
}
