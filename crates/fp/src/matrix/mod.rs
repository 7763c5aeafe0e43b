//! Dense matrices over a coefficient ring.
//!
//! A [`DenseMatrix`] stores its entries in row-major order in a single vector, so that a row is a
//! contiguous slice. The elimination primitives ([`eliminate`], [`DenseMatrix::row_operation`])
//! work on row slices, which lets callers hand disjoint rows to different threads.

use std::{fmt, ops::Index};

use itertools::{Either, Itertools};
use maybe_rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    field::{Field, FieldElement},
    FpError, Result,
};

#[cfg(feature = "proptest")]
pub mod arbitrary;

/// A `rows x columns` matrix with entries in `F`.
///
/// Matrices with zero rows or zero columns are valid and represent the zero map between a zero
/// space and some other space.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "", try_from = "MatrixRepr<F>")]
pub struct DenseMatrix<F: Field> {
    field: F,
    rows: usize,
    columns: usize,
    data: Vec<F::Element>,
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct MatrixRepr<F: Field> {
    field: F,
    rows: usize,
    columns: usize,
    data: Vec<F::Element>,
}

impl<F: Field> TryFrom<MatrixRepr<F>> for DenseMatrix<F> {
    type Error = FpError;

    fn try_from(repr: MatrixRepr<F>) -> Result<Self> {
        Self::from_flat(repr.field, repr.rows, repr.columns, repr.data)
    }
}

impl<F: Field> DenseMatrix<F> {
    /// Creates a zero matrix.
    pub fn new(field: F, rows: usize, columns: usize) -> Self {
        let data = vec![field.zero(); rows * columns];
        Self {
            field,
            rows,
            columns,
            data,
        }
    }

    pub fn identity(field: F, dim: usize) -> Self {
        let mut result = Self::new(field, dim, dim);
        let one = result.field.one();
        for i in 0..dim {
            *result.slot(i, i) = one;
        }
        result
    }

    /// Builds a matrix from its rows. Entries are reduced into the ring.
    ///
    /// # Panics
    /// If the rows do not all have the same length.
    pub fn from_vec(field: F, input: &[Vec<i64>]) -> Self {
        let rows = input.len();
        if rows == 0 {
            return Self::new(field, 0, 0);
        }
        let columns = input[0].len();
        let mut data = Vec::with_capacity(rows * columns);
        for row in input {
            assert_eq!(row.len(), columns, "rows of different lengths");
            data.extend(row.iter().map(|&x| field.el(x)));
        }
        Self {
            field,
            rows,
            columns,
            data,
        }
    }

    /// Builds a matrix from entries in row-major order. The entries must already be reduced.
    pub fn from_flat(
        field: F,
        rows: usize,
        columns: usize,
        data: Vec<F::Element>,
    ) -> Result<Self> {
        if data.len() != rows * columns {
            return Err(FpError::DimensionMismatch {
                what: "number of entries",
                expected: rows * columns,
                found: data.len(),
            });
        }
        for &x in &data {
            check_reduced(&field, x)?;
        }
        Ok(Self {
            field,
            rows,
            columns,
            data,
        })
    }

    pub fn to_vec(&self) -> Vec<Vec<u32>> {
        self.iter_rows()
            .map(|row| row.iter().map(|&x| self.field.value(x)).collect())
            .collect()
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Whether the matrix has no entries at all, i.e. one of its dimensions is zero.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| self.field.is_zero(x))
    }

    fn check_index(&self, row: usize, column: usize) -> Result<usize> {
        if row < self.rows && column < self.columns {
            Ok(row * self.columns + column)
        } else {
            Err(FpError::IndexOutOfRange {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            })
        }
    }

    /// # Panics
    /// If the index is out of range.
    pub fn entry(&self, row: usize, column: usize) -> F::Element {
        self[(row, column)]
    }

    /// # Panics
    /// If the index is out of range or `value` is not reduced.
    pub fn set_entry(&mut self, row: usize, column: usize, value: F::Element) {
        if let Err(e) = check_reduced(&self.field, value) {
            panic!("{e}");
        }
        *self.slot(row, column) = value;
    }

    /// Same as [`DenseMatrix::set_entry`], but reports an invalid index or an unreduced value
    /// instead of panicking. The matrix is unchanged on error.
    pub fn try_set_entry(&mut self, row: usize, column: usize, value: F::Element) -> Result<()> {
        let idx = self.check_index(row, column)?;
        check_reduced(&self.field, value)?;
        self.data[idx] = value;
        Ok(())
    }

    /// The entry at `(row, column)` as a [`FieldElement`].
    pub fn element(&self, row: usize, column: usize) -> FieldElement<'_, F> {
        self.field.wrap(self[(row, column)])
    }

    pub fn get(&self, row: usize, column: usize) -> Result<F::Element> {
        let idx = self.check_index(row, column)?;
        Ok(self.data[idx])
    }

    pub fn row(&self, row: usize) -> &[F::Element] {
        assert!(row < self.rows, "row {row} out of range ({})", self.rows);
        &self.data[row * self.columns..(row + 1) * self.columns]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[F::Element]> {
        (0..self.rows).map(|i| self.row(i))
    }

    /// Splits the matrix into its ring and its rows, as disjoint mutable slices. There are always
    /// `self.rows()` slices, even if the matrix has no columns. This is the form in which the
    /// elimination engine consumes a matrix; values written through the slices must be reduced.
    pub fn field_and_rows_mut(&mut self) -> (&F, impl Iterator<Item = &mut [F::Element]>) {
        let rows = if self.columns == 0 {
            Either::Left(std::iter::repeat_with(<&mut [F::Element]>::default).take(self.rows))
        } else {
            Either::Right(self.data.chunks_mut(self.columns))
        };
        (&self.field, rows)
    }

    /// Applies `row2 <- row2 - c * row1`, where `c = self[(row1, col)]^-1 * self[(row2, col)]`, and
    /// returns `c`. If the pivot entry is not invertible, `c` is zero and nothing changes.
    ///
    /// # Panics
    /// If the rows coincide or an index is out of range.
    pub fn row_operation(&mut self, row1: usize, row2: usize, col: usize) -> F::Element {
        assert_ne!(row1, row2);
        assert!(col < self.columns);
        let columns = self.columns;
        let (pivot, target) = if row1 < row2 {
            let (head, tail) = self.data.split_at_mut(row2 * columns);
            (&head[row1 * columns..(row1 + 1) * columns], &mut tail[..columns])
        } else {
            let (head, tail) = self.data.split_at_mut(row1 * columns);
            (&tail[..columns], &mut head[row2 * columns..(row2 + 1) * columns])
        };
        eliminate(&self.field, pivot, target, col)
    }

    /// Applies `self[target] += coeff * self[source]`.
    pub fn row_op(&mut self, target: usize, source: usize, coeff: F::Element) {
        self.add_row_multiples(target, &[(source, coeff)]);
    }

    /// Applies `row[target] += sum c * row[source]` over the given `(source, c)` pairs.
    ///
    /// # Panics
    /// If `target` is among the sources.
    pub fn add_row_multiples(&mut self, target: usize, terms: &[(usize, F::Element)]) {
        assert!(target < self.rows);
        let columns = self.columns;
        for &(source, c) in terms {
            assert_ne!(source, target, "a row cannot be added to itself");
            assert!(source < self.rows);
            if self.field.is_zero(c) {
                continue;
            }
            for j in 0..columns {
                let x = self.data[source * columns + j];
                let y = &mut self.data[target * columns + j];
                *y = self.field.add(*y, self.field.mul(c, x));
            }
        }
    }

    /// Applies `col[target] += sum c * col[source]` over the given `(source, c)` pairs. The rows
    /// are updated in parallel when the `concurrent` feature is enabled.
    ///
    /// # Panics
    /// If `target` is among the sources.
    pub fn add_column_multiples(&mut self, target: usize, terms: &[(usize, F::Element)]) {
        assert!(target < self.columns);
        for &(source, _) in terms {
            assert_ne!(source, target, "a column cannot be added to itself");
            assert!(source < self.columns);
        }
        if terms.is_empty() || self.rows == 0 {
            return;
        }
        let field = &self.field;
        self.data
            .maybe_par_chunks_mut(self.columns)
            .for_each(|row| {
                let mut acc = row[target];
                for &(source, c) in terms {
                    acc = field.add(acc, field.mul(c, row[source]));
                }
                row[target] = acc;
            });
    }

    /// Applies `col[t] -= k * col[source]` for every `(t, k)` pair. The rows are updated in
    /// parallel when the `concurrent` feature is enabled.
    ///
    /// # Panics
    /// If `source` is among the targets.
    pub fn sub_column_multiples(&mut self, source: usize, terms: &[(usize, F::Element)]) {
        assert!(source < self.columns);
        for &(target, _) in terms {
            assert_ne!(source, target, "a column cannot be subtracted from itself");
            assert!(target < self.columns);
        }
        if terms.is_empty() || self.rows == 0 {
            return;
        }
        let field = &self.field;
        self.data
            .maybe_par_chunks_mut(self.columns)
            .for_each(|row| {
                let x = row[source];
                if field.is_zero(x) {
                    return;
                }
                for &(target, k) in terms {
                    row[target] = field.sub(row[target], field.mul(k, x));
                }
            });
    }

    /// Replaces the contents of `self` by those of `other`, reusing the allocation.
    pub fn assign(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Sets every entry to zero.
    pub fn clear(&mut self) {
        let zero = self.field.zero();
        self.data.fill(zero);
    }

    pub fn transpose(&self) -> Self {
        let mut result = Self::new(self.field.clone(), self.columns, self.rows);
        for i in 0..self.rows {
            for j in 0..self.columns {
                *result.slot(j, i) = self[(i, j)];
            }
        }
        result
    }

    /// Computes `R * D * C`, where `R` is lower unitriangular, `C` is upper unitriangular and
    /// `D` is the `rows x columns` matrix with ones in the first `rank` diagonal positions. The
    /// strictly triangular entries of `R` and then `C` are drawn from `entries`. The result has
    /// rank exactly `rank`, also over `Z/p^k`, since `R` and `C` are invertible.
    ///
    /// Returns `None` if `rank` exceeds `min(rows, columns)`.
    pub fn planted_rank(
        field: F,
        rows: usize,
        columns: usize,
        rank: usize,
        mut entries: impl FnMut() -> i64,
    ) -> Option<Self> {
        if rank > rows.min(columns) {
            tracing::warn!(
                rows,
                columns,
                rank,
                "requested rank exceeds the maximal possible rank"
            );
            return None;
        }

        let mut r = Self::identity(field.clone(), rows);
        for i in 0..rows {
            for j in 0..i {
                *r.slot(i, j) = field.el(entries());
            }
        }

        let mut d = Self::new(field.clone(), rows, columns);
        for i in 0..rank {
            *d.slot(i, i) = field.one();
        }

        let mut c = Self::identity(field.clone(), columns);
        for i in 0..columns {
            for j in i + 1..columns {
                *c.slot(i, j) = field.el(entries());
            }
        }

        Some(&(&r * &d) * &c)
    }
}

/// Applies `target <- target - c * pivot`, where `c = pivot[col]^-1 * target[col]`, and returns
/// `c`. This is the elementary step of elimination; it only touches the two slices, so disjoint
/// rows can be processed concurrently.
pub fn eliminate<F: Field>(
    field: &F,
    pivot: &[F::Element],
    target: &mut [F::Element],
    col: usize,
) -> F::Element {
    debug_assert_eq!(pivot.len(), target.len());
    let c = field.div(target[col], pivot[col]);
    if field.is_zero(c) {
        return c;
    }
    for (t, &p) in target.iter_mut().zip(pivot) {
        *t = field.sub(*t, field.mul(c, p));
    }
    c
}

impl<F: Field> Index<(usize, usize)> for DenseMatrix<F> {
    type Output = F::Element;

    fn index(&self, (row, column): (usize, usize)) -> &F::Element {
        assert!(
            row < self.rows && column < self.columns,
            "index ({row}, {column}) out of range for a {}x{} matrix",
            self.rows,
            self.columns
        );
        &self.data[row * self.columns + column]
    }
}

impl<F: Field> DenseMatrix<F> {
    /// Unchecked write access for values this module has produced itself.
    fn slot(&mut self, row: usize, column: usize) -> &mut F::Element {
        assert!(
            row < self.rows && column < self.columns,
            "index ({row}, {column}) out of range for a {}x{} matrix",
            self.rows,
            self.columns
        );
        &mut self.data[row * self.columns + column]
    }
}

fn check_reduced<F: Field>(field: &F, value: F::Element) -> Result<()> {
    if field.value(value) < field.order() {
        Ok(())
    } else {
        Err(FpError::UnreducedValue {
            value: field.value(value),
            order: field.order(),
        })
    }
}

impl<F: Field> fmt::Display for DenseMatrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut it = self.iter_rows();
        if let Some(x) = it.next() {
            write!(f, "[\n    [{}]", x.iter().format(", "))?;
        } else {
            return write!(f, "[]");
        }
        for x in it {
            write!(f, ",\n    [{}]", x.iter().format(", "))?;
        }
        write!(f, "\n]")
    }
}

impl<F: Field> fmt::Debug for DenseMatrix<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} over {}: {}", self.rows, self.columns, self.field, self)
    }
}

impl<F: Field> std::ops::Mul for &DenseMatrix<F> {
    type Output = DenseMatrix<F>;

    fn mul(self, rhs: Self) -> DenseMatrix<F> {
        assert_eq!(self.field, rhs.field);
        assert_eq!(self.columns(), rhs.rows());

        let field = &self.field;
        let mut result = DenseMatrix::new(field.clone(), self.rows(), rhs.columns());
        for i in 0..self.rows() {
            for k in 0..self.columns() {
                let a = self[(i, k)];
                if field.is_zero(a) {
                    continue;
                }
                for j in 0..rhs.columns() {
                    let entry = result.slot(i, j);
                    *entry = field.add(*entry, field.mul(a, rhs[(k, j)]));
                }
            }
        }
        result
    }
}
