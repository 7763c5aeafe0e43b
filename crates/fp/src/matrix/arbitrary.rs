use proptest::prelude::*;

use super::DenseMatrix;
use crate::field::Field;

pub const MAX_ROWS: usize = 24;
pub const MAX_COLUMNS: usize = 24;

#[derive(Debug, Clone)]
pub struct MatrixArbParams<F> {
    pub field: F,
    pub rows: BoxedStrategy<usize>,
    pub columns: BoxedStrategy<usize>,
}

impl<F: Field> MatrixArbParams<F> {
    pub fn new(field: F) -> Self {
        Self {
            field,
            rows: (0..=MAX_ROWS).boxed(),
            columns: (0..=MAX_COLUMNS).boxed(),
        }
    }
}

impl<F: Field> DenseMatrix<F> {
    /// A matrix with uniformly random entries.
    pub fn arbitrary_with(args: MatrixArbParams<F>) -> impl Strategy<Value = Self> {
        let field = args.field;
        (args.rows, args.columns).prop_flat_map(move |(rows, columns)| {
            let field = field.clone();
            let order = field.order() as i64;
            proptest::collection::vec(0..order, rows * columns).prop_map(move |v| {
                let data = v.into_iter().map(|x| field.el(x)).collect();
                Self {
                    field: field.clone(),
                    rows,
                    columns,
                    data,
                }
            })
        })
    }

    /// A matrix of known rank, built by [`DenseMatrix::planted_rank`] with random triangular
    /// factors. The strategy yields the matrix together with its rank.
    pub fn arbitrary_planted_rank_with(
        args: MatrixArbParams<F>,
    ) -> impl Strategy<Value = (Self, usize)> {
        let field = args.field;
        (args.rows, args.columns)
            .prop_flat_map(|(rows, columns)| {
                let triangular = rows * rows.saturating_sub(1) / 2
                    + columns * columns.saturating_sub(1) / 2;
                (
                    Just(rows),
                    Just(columns),
                    0..=rows.min(columns),
                    proptest::collection::vec(any::<i64>(), triangular),
                )
            })
            .prop_filter_map("rank exceeds dimensions", move |(rows, columns, rank, v)| {
                let mut entries = v.into_iter();
                let m = Self::planted_rank(field.clone(), rows, columns, rank, || {
                    entries.next().unwrap_or(0)
                })?;
                Some((m, rank))
            })
    }
}
