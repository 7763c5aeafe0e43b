//! Rank computation by Gaussian elimination without row permutations.
//!
//! The matrix is swept column by column. For each column we look, among the rows that have not
//! yet been used as pivots, for the first one whose entry in that column is invertible. That row
//! becomes the pivot of the column and is used to clear the column in every other unused row. The
//! rank is the number of pivots found.
//!
//! Rows are never swapped. Instead we keep the list of unused rows in order and remove pivots
//! from it. Over `Z/p^k` a column may contain non-zero entries none of which is invertible; such
//! a column has no pivot and its entries are left in place.
//!
//! With `n >= 1` worker threads, clearing a column is split into `n` jobs on disjoint ranges of
//! rows. The calling thread acts as the producer. It picks the pivot, enqueues the jobs on a
//! [`WorkList`](work_list::WorkList) and waits for all workers to finish before moving on to the
//! next column.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use fp::{
    field::Field,
    matrix::{eliminate, DenseMatrix},
    FpError,
};
use parking_lot::Mutex;

use crate::utils;

pub mod work_list;

use work_list::{ProducerGuard, WorkList};

/// The result of diagonalizing a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Diagonalization {
    rank: usize,
    rows: usize,
    columns: usize,
}

impl Diagonalization {
    /// The diagonalization of a zero matrix of the given shape.
    pub(crate) fn zero_map(rows: usize, columns: usize) -> Self {
        Self {
            rank: 0,
            rows,
            columns,
        }
    }

    /// The dimension of the image.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The dimension of the kernel, i.e. the number of columns minus the rank.
    pub fn defect(&self) -> usize {
        self.columns - self.rank
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }
}

/// Diagonalizes matrices, either sequentially or with a fixed number of worker threads.
///
/// The result does not depend on the number of threads: all settings produce the same rank and
/// leave the matrix in the same state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagonalizer {
    num_threads: usize,
}

impl Diagonalizer {
    /// A diagonalizer using `num_threads` worker threads in addition to the calling thread. If
    /// `num_threads` is zero, everything happens on the calling thread.
    pub fn new(num_threads: usize) -> Self {
        Self { num_threads }
    }

    pub fn sequential() -> Self {
        Self::new(0)
    }

    /// Reads the number of threads from the environment. See [`utils::num_threads`].
    pub fn from_env() -> Self {
        Self::new(utils::num_threads())
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Diagonalizes `matrix` in place and returns its rank.
    pub fn diagonalize<F: Field>(&self, matrix: &mut DenseMatrix<F>) -> Diagonalization {
        self.run(matrix, None, None, &AtomicUsize::new(0))
    }

    /// Same as [`Diagonalizer::diagonalize`], but keeps `progress` equal to the number of pivots
    /// found so far, so that another thread can monitor the computation.
    pub fn diagonalize_with_progress<F: Field>(
        &self,
        matrix: &mut DenseMatrix<F>,
        progress: &AtomicUsize,
    ) -> Diagonalization {
        self.run(matrix, None, None, progress)
    }

    /// Diagonalizes `matrix` by row operations and applies the inverse operations to the columns
    /// of `post`, so that `post * matrix` is unchanged. `post` is typically the differential
    /// following `matrix`.
    pub fn diagonalize_with_post<F: Field>(
        &self,
        matrix: &mut DenseMatrix<F>,
        post: &mut DenseMatrix<F>,
    ) -> Result<Diagonalization, FpError> {
        self.diagonalize_with_neighbours(matrix, None, Some(post))
    }

    /// Diagonalizes `matrix` by row operations and then clears each pivot row by column
    /// operations. The inverse row operations are applied to `post` and the inverse column
    /// operations to `pre`, so that both `post * matrix` and `matrix * pre` are unchanged.
    ///
    /// Over a field, every pivot row of the result has exactly one non-zero entry.
    pub fn diagonalize_with_adjacent<F: Field>(
        &self,
        matrix: &mut DenseMatrix<F>,
        pre: &mut DenseMatrix<F>,
        post: &mut DenseMatrix<F>,
    ) -> Result<Diagonalization, FpError> {
        self.diagonalize_with_neighbours(matrix, Some(pre), Some(post))
    }

    /// Diagonalizes `matrix`, propagating the change of basis to whichever neighbours are given.
    /// See [`Diagonalizer::diagonalize_with_adjacent`].
    pub fn diagonalize_with_neighbours<F: Field>(
        &self,
        matrix: &mut DenseMatrix<F>,
        pre: Option<&mut DenseMatrix<F>>,
        post: Option<&mut DenseMatrix<F>>,
    ) -> Result<Diagonalization, FpError> {
        if let Some(post) = post.as_deref() {
            check_post(matrix, post)?;
        }
        if let Some(pre) = pre.as_deref() {
            check_pre(matrix, pre)?;
        }
        Ok(self.run(matrix, post, pre, &AtomicUsize::new(0)))
    }

    #[tracing::instrument(
        skip_all,
        fields(
            rows = matrix.rows(),
            columns = matrix.columns(),
            threads = self.num_threads,
            rank
        )
    )]
    fn run<F: Field>(
        &self,
        matrix: &mut DenseMatrix<F>,
        mut post: Option<&mut DenseMatrix<F>>,
        pre: Option<&mut DenseMatrix<F>>,
        progress: &AtomicUsize,
    ) -> Diagonalization {
        progress.store(0, Ordering::Relaxed);
        let rows = matrix.rows();
        let columns = matrix.columns();

        let pivots = if rows == 0 || columns == 0 {
            Vec::new()
        } else {
            let mut on_column = |pivot: usize, eliminations: &mut Vec<(usize, F::Element)>| {
                if let Some(post) = post.as_deref_mut() {
                    eliminations.sort_unstable_by_key(|&(target, _)| target);
                    post.add_column_multiples(pivot, eliminations);
                }
            };
            let (field, row_slices) = matrix.field_and_rows_mut();
            if self.num_threads == 0 {
                let row_slices: Vec<_> = row_slices.collect();
                eliminate_sequential(field, row_slices, columns, progress, &mut on_column)
            } else {
                let row_slices: Vec<_> = row_slices.map(Mutex::new).collect();
                eliminate_parallel(
                    field,
                    &row_slices,
                    columns,
                    self.num_threads,
                    progress,
                    &mut on_column,
                )
            }
        };

        if let Some(pre) = pre {
            clear_pivot_rows(matrix, pre, &pivots);
        }

        let rank = pivots.len();
        tracing::Span::current().record("rank", rank);
        Diagonalization {
            rank,
            rows,
            columns,
        }
    }
}

fn check_post<F: Field>(matrix: &DenseMatrix<F>, post: &DenseMatrix<F>) -> Result<(), FpError> {
    if matrix.field() != post.field() {
        return Err(FpError::FieldMismatch);
    }
    if post.columns() != matrix.rows() {
        return Err(FpError::DimensionMismatch {
            what: "columns of the following differential",
            expected: matrix.rows(),
            found: post.columns(),
        });
    }
    Ok(())
}

fn check_pre<F: Field>(matrix: &DenseMatrix<F>, pre: &DenseMatrix<F>) -> Result<(), FpError> {
    if matrix.field() != pre.field() {
        return Err(FpError::FieldMismatch);
    }
    if pre.rows() != matrix.columns() {
        return Err(FpError::DimensionMismatch {
            what: "rows of the preceding differential",
            expected: matrix.columns(),
            found: pre.rows(),
        });
    }
    Ok(())
}

/// Removes and returns the first row in `remaining` that satisfies `is_pivot`.
fn take_pivot(remaining: &mut Vec<usize>, is_pivot: impl Fn(usize) -> bool) -> Option<usize> {
    let pos = remaining.iter().position(|&r| is_pivot(r))?;
    Some(remaining.remove(pos))
}

/// Runs the elimination on the calling thread. Returns the `(row, column)` pairs of the pivots,
/// ordered by column. After each column, `on_column` is called with the pivot row and the
/// `(target, coefficient)` pairs of the row operations performed.
fn eliminate_sequential<F: Field>(
    field: &F,
    mut rows: Vec<&mut [F::Element]>,
    columns: usize,
    progress: &AtomicUsize,
    on_column: &mut impl FnMut(usize, &mut Vec<(usize, F::Element)>),
) -> Vec<(usize, usize)> {
    let mut remaining: Vec<usize> = (0..rows.len()).collect();
    let mut pivots = Vec::new();
    let mut eliminations = Vec::new();

    for col in 0..columns {
        if remaining.is_empty() {
            break;
        }
        let Some(p) = take_pivot(&mut remaining, |r| field.is_invertible(rows[r][col])) else {
            continue;
        };
        pivots.push((p, col));
        progress.fetch_add(1, Ordering::Relaxed);

        let pivot = rows[p].to_vec();
        for &t in &remaining {
            if !field.is_zero(rows[t][col]) {
                let c = eliminate(field, &pivot, &mut *rows[t], col);
                eliminations.push((t, c));
            }
        }
        on_column(p, &mut eliminations);
        eliminations.clear();
    }
    pivots
}

/// A range of rows to be cleared in `column` using `pivot`.
struct Job<E> {
    pivot: Arc<[E]>,
    column: usize,
    targets: Vec<usize>,
}

/// Same as [`eliminate_sequential`], but the row operations of each column are distributed over
/// `num_threads` workers.
fn eliminate_parallel<F: Field>(
    field: &F,
    rows: &[Mutex<&mut [F::Element]>],
    columns: usize,
    num_threads: usize,
    progress: &AtomicUsize,
    on_column: &mut impl FnMut(usize, &mut Vec<(usize, F::Element)>),
) -> Vec<(usize, usize)> {
    let list = WorkList::new();
    let eliminations = Mutex::new(Vec::new());

    std::thread::scope(|s| {
        for _ in 0..num_threads {
            s.spawn(|| work(field, rows, &list, &eliminations));
        }

        let _guard = ProducerGuard(&list);

        let mut remaining: Vec<usize> = (0..rows.len()).collect();
        let mut pivots = Vec::new();

        for col in 0..columns {
            if remaining.is_empty() {
                break;
            }
            let Some(p) = take_pivot(&mut remaining, |r| field.is_invertible(rows[r].lock()[col]))
            else {
                continue;
            };
            pivots.push((p, col));
            progress.fetch_add(1, Ordering::Relaxed);

            let targets: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&t| !field.is_zero(rows[t].lock()[col]))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let pivot: Arc<[F::Element]> = Arc::from(&**rows[p].lock());
            for chunk in targets.chunks(targets.len().div_ceil(num_threads)) {
                list.put(Job {
                    pivot: Arc::clone(&pivot),
                    column: col,
                    targets: chunk.to_vec(),
                });
            }
            if !list.wait_for_workers() {
                // A worker panicked. The panic resurfaces when the scope joins it.
                break;
            }

            let mut eliminations = eliminations.lock();
            on_column(p, &mut eliminations);
            eliminations.clear();
        }
        pivots
    })
}

fn work<F: Field>(
    field: &F,
    rows: &[Mutex<&mut [F::Element]>],
    list: &WorkList<Job<F::Element>>,
    eliminations: &Mutex<Vec<(usize, F::Element)>>,
) {
    let mut local = Vec::new();
    while let Some((job, _claim)) = list.get() {
        for &t in &job.targets {
            let mut row = rows[t].lock();
            let c = eliminate(field, &job.pivot, &mut row, job.column);
            local.push((t, c));
        }
        tracing::debug!(
            column = job.column,
            rows = job.targets.len(),
            "cleared rows"
        );
        eliminations.lock().append(&mut local);
    }
}

/// Clears every pivot row except at its pivot by column operations on `matrix`, and applies the
/// inverse operations to the rows of `pre`.
fn clear_pivot_rows<F: Field>(
    matrix: &mut DenseMatrix<F>,
    pre: &mut DenseMatrix<F>,
    pivots: &[(usize, usize)],
) {
    let field = matrix.field().clone();
    for &(row, col) in pivots {
        let Some(a_inv) = field.inv(matrix[(row, col)]) else {
            continue;
        };
        let terms: Vec<(usize, F::Element)> = matrix
            .row(row)
            .iter()
            .enumerate()
            .filter(|&(j, &x)| j != col && !field.is_zero(x))
            .map(|(j, &x)| (j, field.mul(a_inv, x)))
            .collect();
        matrix.sub_column_multiples(col, &terms);
        pre.add_row_multiples(col, &terms);
    }
}
