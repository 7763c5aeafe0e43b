use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FpError {
    #[error("Not an integer: {0}")]
    NotAnInteger(#[from] std::num::ParseIntError),

    #[error("{0} is not a valid prime")]
    InvalidPrime(u32),

    #[error("invalid modulus {prime}^{exponent}")]
    InvalidModulus { prime: u32, exponent: u32 },

    #[error("modulus {prime}^{exponent} exceeds the largest supported order {max}")]
    ModulusTooLarge { prime: u32, exponent: u32, max: u32 },

    #[error("{value} is not invertible modulo {order}")]
    DivisionByNonInvertible { value: u32, order: u32 },

    #[error("{value} is not reduced modulo {order}")]
    UnreducedValue { value: u32, order: u32 },

    #[error("index ({row}, {column}) is out of range for a {rows}x{columns} matrix")]
    IndexOutOfRange {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },

    #[error("{what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("matrices are defined over different coefficient rings")]
    FieldMismatch,
}
