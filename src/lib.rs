//! Homology of chain complexes over `Z/p^k`.
//!
//! A [`ChainComplex`] stores the differentials `d_n: C_n -> C_{n-1}` of a complex of finite
//! dimensional free modules as dense matrices, indexed by degree. Its homology is computed from
//! the ranks of the differentials, which are found by a [`Diagonalizer`]. The diagonalizer runs
//! either on the calling thread or on a fixed pool of worker threads.
//!
//! The coefficient rings and matrices live in the [`fp`] crate. A ring is an explicit value, so
//! computations with different moduli can coexist.
//!
//! # Example
//! ```
//! use fp::{field::Zm, matrix::DenseMatrix};
//! use homology::{ChainComplex, Diagonalizer};
//!
//! let f = Zm::new(5, 1).unwrap();
//! let mut complex = ChainComplex::with_diagonalizer(f.clone(), Diagonalizer::new(2));
//! complex
//!     .set_differential(1, DenseMatrix::from_vec(f, &[vec![1, 4]]))
//!     .unwrap();
//!
//! let homology = complex.homology();
//! assert_eq!(homology.free_dimension(0), 0);
//! assert_eq!(homology.free_dimension(1), 1);
//! ```
//!
//! # Configuration
//! [`Diagonalizer::from_env`] reads the number of worker threads from the `HOMOLOGY_THREADS`
//! environment variable. Progress and timing information is emitted through [`tracing`]; it is up
//! to the binary to install a subscriber.

pub mod chain_complex;
pub mod diagonalizer;
pub mod homology;
pub mod utils;

pub use chain_complex::ChainComplex;
pub use diagonalizer::{Diagonalization, Diagonalizer};
pub use homology::HomologyRecord;
