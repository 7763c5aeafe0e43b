use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::Field;
use crate::prime::Prime;

/// A prime field. This is just a wrapper around a prime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fp<P> {
    p: P,
}

impl<P: Prime> Fp<P> {
    pub const fn new(p: P) -> Self {
        Self { p }
    }
}

impl<P: Prime> Field for Fp<P> {
    type Element = u32;

    fn characteristic(&self) -> u32 {
        self.p.as_u32()
    }

    fn order(&self) -> u32 {
        self.p.as_u32()
    }

    fn is_field(&self) -> bool {
        true
    }

    fn el(&self, n: i64) -> u32 {
        n.rem_euclid(self.p.as_u32() as i64) as u32
    }

    fn value(&self, a: u32) -> u32 {
        a
    }

    fn zero(&self) -> u32 {
        0
    }

    fn one(&self) -> u32 {
        1
    }

    fn add(&self, a: u32, b: u32) -> u32 {
        self.p.sum(a, b)
    }

    fn sub(&self, a: u32, b: u32) -> u32 {
        self.p.sum(a, self.neg(b))
    }

    fn mul(&self, a: u32, b: u32) -> u32 {
        self.p.product(a, b)
    }

    fn neg(&self, a: u32) -> u32 {
        if a == 0 {
            0
        } else {
            self.p.as_u32() - a
        }
    }

    fn inv(&self, a: u32) -> Option<u32> {
        if a == 0 {
            None
        } else {
            Some(crate::prime::inverse(self.p, a))
        }
    }
}

impl<P: Prime> Display for Fp<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "F_{}", self.p)
    }
}

impl<P> std::ops::Deref for Fp<P> {
    type Target = P;

    fn deref(&self) -> &Self::Target {
        &self.p
    }
}

impl<P: Prime> From<P> for Fp<P> {
    fn from(p: P) -> Self {
        Self { p }
    }
}
