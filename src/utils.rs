//! Process-level configuration.

use std::env;

/// The environment variable holding the number of worker threads used by
/// [`Diagonalizer::from_env`](crate::diagonalizer::Diagonalizer::from_env). `0` selects the
/// sequential algorithm.
pub const THREADS_VAR: &str = "HOMOLOGY_THREADS";

/// The number of worker threads to use. This reads [`THREADS_VAR`] and falls back to the
/// available parallelism of the machine if it is unset or invalid.
pub fn num_threads() -> usize {
    match env::var(THREADS_VAR) {
        Ok(n) => match parse_num_threads(&n) {
            Some(n) => return n,
            None => tracing::warn!(value = %n, "Invalid value of {THREADS_VAR} variable"),
        },
        Err(env::VarError::NotUnicode(_)) => {
            tracing::warn!("Invalid value of {THREADS_VAR} variable")
        }
        Err(env::VarError::NotPresent) => (),
    };

    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

fn parse_num_threads(s: &str) -> Option<usize> {
    s.trim().parse().ok()
}
