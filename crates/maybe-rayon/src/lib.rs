//! A thin switch between rayon and sequential iteration.
//!
//! Code written against [`prelude`] compiles to rayon parallel iterators when the `concurrent`
//! feature is enabled and to ordinary iterators otherwise. Closures passed to the adapters must
//! therefore be `Fn + Send + Sync` even in sequential builds.

#[cfg(feature = "concurrent")]
pub mod concurrent;
#[cfg(feature = "concurrent")]
pub use concurrent::*;

#[cfg(not(feature = "concurrent"))]
pub mod sequential;
#[cfg(not(feature = "concurrent"))]
pub use sequential::*;
