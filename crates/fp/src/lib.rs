//! Coefficient rings `Z/p^k` and dense matrices over them.
//!
//! There is no global field state. A coefficient ring is a value implementing [`field::Field`]
//! (either the prime field [`field::Fp`] or the table-driven ring [`field::Zm`]), and every
//! element operation and every [`matrix::DenseMatrix`] goes through such a value.
#![allow(clippy::many_single_char_names)]

pub mod error;
pub mod field;
pub mod matrix;
pub mod prime;

pub use error::FpError;

pub type Result<T> = std::result::Result<T, FpError>;
