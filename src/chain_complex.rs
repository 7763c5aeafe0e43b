use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    sync::atomic::AtomicUsize,
};

use fp::{field::Field, matrix::DenseMatrix, FpError};
use itertools::Itertools;
use maybe_rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    diagonalizer::{Diagonalization, Diagonalizer},
    homology::HomologyRecord,
};

/// A chain complex of finite dimensional free modules over `F`, given by its differentials.
///
/// The differential `d_n: C_n -> C_{n-1}` is stored as a `dim C_{n-1} x dim C_n` matrix, so that
/// the columns index the basis of `C_n`. A degree without a stored differential denotes the zero
/// map. Its dimensions are inferred from the neighbouring differentials, and a degree with no
/// stored neighbour has dimension zero, as does every degree outside the range of `i32`.
///
/// It is up to the caller to make sure that `d_{n-1} d_n = 0`. This is not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ChainComplex<F: Field> {
    field: F,
    differentials: BTreeMap<i32, DenseMatrix<F>>,
    #[serde(skip)]
    diagonalizer: Diagonalizer,
    /// Degrees whose differential was removed by [`ChainComplex::take_kernel_and_torsion`].
    #[serde(skip)]
    taken: BTreeSet<i32>,
}

impl<F: Field> ChainComplex<F> {
    /// An empty complex, using the sequential diagonalizer.
    pub fn new(field: F) -> Self {
        Self {
            field,
            differentials: BTreeMap::new(),
            diagonalizer: Diagonalizer::sequential(),
            taken: BTreeSet::new(),
        }
    }

    pub fn with_diagonalizer(field: F, diagonalizer: Diagonalizer) -> Self {
        Self {
            diagonalizer,
            ..Self::new(field)
        }
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn diagonalizer(&self) -> Diagonalizer {
        self.diagonalizer
    }

    pub fn set_diagonalizer(&mut self, diagonalizer: Diagonalizer) {
        self.diagonalizer = diagonalizer;
    }

    /// Sets `d_n`, returning the previous differential if there was one.
    pub fn set_differential(
        &mut self,
        n: i32,
        differential: DenseMatrix<F>,
    ) -> Result<Option<DenseMatrix<F>>, FpError> {
        if differential.field() != &self.field {
            return Err(FpError::FieldMismatch);
        }
        self.taken.remove(&n);
        Ok(self.differentials.insert(n, differential))
    }

    pub fn differential(&self, n: i32) -> Option<&DenseMatrix<F>> {
        self.differentials.get(&n)
    }

    pub fn differential_mut(&mut self, n: i32) -> Option<&mut DenseMatrix<F>> {
        self.differentials.get_mut(&n)
    }

    /// The differential `d_n`, or the zero map of the right shape if it is not stored.
    pub fn differential_or_zero(&self, n: i32) -> Cow<'_, DenseMatrix<F>> {
        match self.differentials.get(&n) {
            Some(d) => Cow::Borrowed(d),
            None => Cow::Owned(DenseMatrix::new(
                self.field.clone(),
                self.target_dimension(n),
                self.dimension(n),
            )),
        }
    }

    pub fn contains(&self, n: i32) -> bool {
        self.differentials.contains_key(&n)
    }

    pub fn remove_differential(&mut self, n: i32) -> Option<DenseMatrix<F>> {
        self.differentials.remove(&n)
    }

    pub fn clear(&mut self) {
        self.differentials.clear();
        self.taken.clear();
    }

    /// The degrees with a stored differential, in increasing order.
    pub fn degrees(&self) -> impl Iterator<Item = i32> + '_ {
        self.differentials.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.differentials.is_empty()
    }

    /// The dimension of `C_n`.
    pub fn dimension(&self, n: i32) -> usize {
        if let Some(d) = self.differentials.get(&n) {
            d.columns()
        } else if let Some(d) = n.checked_add(1).and_then(|m| self.differentials.get(&m)) {
            d.rows()
        } else {
            0
        }
    }

    /// The dimension of `C_{n-1}`, the target of `d_n`.
    fn target_dimension(&self, n: i32) -> usize {
        match n.checked_sub(1) {
            Some(m) => self.dimension(m),
            None => self.differentials.get(&n).map_or(0, DenseMatrix::rows),
        }
    }

    /// The largest rank `d_n` could have, i.e. the smaller of its dimensions.
    pub fn max_rank(&self, n: i32) -> usize {
        self.target_dimension(n).min(self.dimension(n))
    }

    fn index_error(&self, n: i32, row: usize, column: usize) -> FpError {
        FpError::IndexOutOfRange {
            row,
            column,
            rows: self.target_dimension(n),
            columns: self.dimension(n),
        }
    }

    /// The entry of `d_n` at `(row, column)`. Entries of a zero map inside its shape are zero.
    pub fn entry(&self, n: i32, row: usize, column: usize) -> Result<F::Element, FpError> {
        match self.differentials.get(&n) {
            Some(d) => d.get(row, column),
            None if row < self.target_dimension(n) && column < self.dimension(n) => {
                Ok(self.field.zero())
            }
            None => Err(self.index_error(n, row, column)),
        }
    }

    /// Sets an entry of `d_n`. The differential has to be stored and `value` has to be reduced.
    pub fn set_entry(
        &mut self,
        n: i32,
        row: usize,
        column: usize,
        value: F::Element,
    ) -> Result<(), FpError> {
        match self.differentials.get_mut(&n) {
            Some(d) => d.try_set_entry(row, column, value),
            None => Err(self.index_error(n, row, column)),
        }
    }

    /// Diagonalizes a copy of `d_n`.
    fn rank_of(&self, n: i32, progress: &AtomicUsize) -> Diagonalization {
        match self.differentials.get(&n) {
            Some(d) => {
                let mut d = d.clone();
                self.diagonalizer.diagonalize_with_progress(&mut d, progress)
            }
            None => Diagonalization::zero_map(self.target_dimension(n), self.dimension(n)),
        }
    }

    /// The homology in degree `n`. The stored differentials are not modified.
    pub fn homology_at(&self, n: i32) -> HomologyRecord {
        self.homology_at_with_progress(n, &AtomicUsize::new(0))
    }

    /// Same as [`ChainComplex::homology_at`], but `progress` tracks the rank found so far in the
    /// differential that is currently being diagonalized.
    #[tracing::instrument(skip(self, progress), fields(kern, tors))]
    pub fn homology_at_with_progress(&self, n: i32, progress: &AtomicUsize) -> HomologyRecord {
        let kern = self.dimension(n) - self.rank_of(n, progress).rank();
        let tors = n
            .checked_add(1)
            .map_or(0, |m| self.rank_of(m, progress).rank());

        let span = tracing::Span::current();
        span.record("kern", kern);
        span.record("tors", tors);

        HomologyRecord::single(n, kern, tors)
    }

    /// The homology in every degree that is adjacent to a stored differential. Every stored
    /// differential is diagonalized once. With the `concurrent` feature, the differentials are
    /// diagonalized in parallel.
    #[tracing::instrument(skip(self), fields(differentials = self.differentials.len()))]
    pub fn homology(&self) -> HomologyRecord {
        let ranks: BTreeMap<i32, usize> = self
            .degrees()
            .collect::<Vec<_>>()
            .into_maybe_par_iter()
            .map(|n| (n, self.rank_of(n, &AtomicUsize::new(0)).rank()))
            .collect();
        let rank = |n: i32| ranks.get(&n).copied().unwrap_or(0);

        let mut result = HomologyRecord::new();
        for n in self
            .degrees()
            .flat_map(|n| n.checked_sub(1).into_iter().chain([n]))
            .dedup()
        {
            result.set_kern(n, self.dimension(n) - rank(n));
            result.set_tors(n, n.checked_add(1).map_or(0, rank));
        }
        result
    }

    /// Diagonalizes `d_n` and records the two quantities it determines: the kernel in degree `n`
    /// and the torsion in degree `n - 1`. If `d_{n-1}` is the zero map, the kernel in degree
    /// `n - 1` is recorded as well. Merging the records of all stored degrees computes the
    /// homology with one diagonalization per differential.
    pub fn kernel_and_torsion(&self, n: i32) -> HomologyRecord {
        let d = self.rank_of(n, &AtomicUsize::new(0));
        self.kernel_and_torsion_record(n, d)
    }

    /// Same as [`ChainComplex::kernel_and_torsion`], but removes `d_n` from the complex and
    /// diagonalizes it in place, which avoids a copy. The degrees may be taken in any order.
    pub fn take_kernel_and_torsion(&mut self, n: i32, progress: &AtomicUsize) -> HomologyRecord {
        let d = match self.differentials.remove(&n) {
            Some(mut d) => self.diagonalizer.diagonalize_with_progress(&mut d, progress),
            None => Diagonalization::zero_map(self.target_dimension(n), self.dimension(n)),
        };
        let result = self.kernel_and_torsion_record(n, d);
        self.taken.insert(n);
        result
    }

    fn kernel_and_torsion_record(&self, n: i32, d: Diagonalization) -> HomologyRecord {
        let mut result = HomologyRecord::new();
        result.set_kern(n, d.defect());
        if let Some(m) = n.checked_sub(1) {
            result.set_tors(m, d.rank());
            // A taken d_{n-1} has recorded its own kernel
            if !self.differentials.contains_key(&m) && !self.taken.contains(&m) {
                result.set_kern(m, d.rows());
            }
        }
        result
    }

    /// Diagonalizes the stored `d_n` in place. The change of basis is propagated to `d_{n-1}` and
    /// `d_{n+1}` where these are stored, so that the complex stays isomorphic to the original
    /// one. Returns `None` if `d_n` is not stored.
    pub fn diagonalize_differential(
        &mut self,
        n: i32,
    ) -> Result<Option<Diagonalization>, FpError> {
        let Some(mut d) = self.differentials.remove(&n) else {
            return Ok(None);
        };
        let below = n.checked_sub(1);
        let above = n.checked_add(1);
        let mut post = below.and_then(|m| self.differentials.remove(&m));
        let mut pre = above.and_then(|m| self.differentials.remove(&m));

        let result = self
            .diagonalizer
            .diagonalize_with_neighbours(&mut d, pre.as_mut(), post.as_mut());

        self.differentials.insert(n, d);
        if let (Some(m), Some(post)) = (below, post) {
            self.differentials.insert(m, post);
        }
        if let (Some(m), Some(pre)) = (above, pre) {
            self.differentials.insert(m, pre);
        }
        result.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use fp::{
        field::{Fp, Zm},
        prime::P3,
    };

    use super::*;

    fn complex() -> ChainComplex<Fp<P3>> {
        let f = Fp::new(P3);
        let mut c = ChainComplex::new(f);
        // C_1 = F^2 -> C_0 = F^1, C_2 = F^1 -> C_1 = F^2
        c.set_differential(1, DenseMatrix::from_vec(f, &[vec![1, 1]]))
            .unwrap();
        c.set_differential(2, DenseMatrix::from_vec(f, &[vec![1], vec![2]]))
            .unwrap();
        c
    }

    #[test]
    fn dimensions() {
        let c = complex();
        assert_eq!(c.dimension(-1), 0);
        assert_eq!(c.dimension(0), 1);
        assert_eq!(c.dimension(1), 2);
        assert_eq!(c.dimension(2), 1);
        assert_eq!(c.dimension(3), 0);
        assert_eq!(c.max_rank(1), 1);
        assert_eq!(c.max_rank(0), 0);

        let zero = c.differential_or_zero(0);
        assert_eq!((zero.rows(), zero.columns()), (0, 1));
        assert!(matches!(c.differential_or_zero(1), Cow::Borrowed(_)));
    }

    #[test]
    fn entries() {
        let mut c = complex();
        assert_eq!(c.entry(2, 1, 0), Ok(2));
        c.set_entry(2, 1, 0, 0).unwrap();
        assert_eq!(c.entry(2, 1, 0), Ok(0));
        c.set_entry(1, 0, 1, 2).unwrap();
        assert_eq!(c.differential(1).unwrap().row(0), [1, 2]);

        // d_3 is the zero map from C_3 = 0 to C_2 = F
        assert!(c.entry(3, 0, 0).is_err());
        assert!(c.set_entry(0, 0, 0, 1).is_err());
        assert_eq!(
            c.entry(2, 2, 0),
            Err(FpError::IndexOutOfRange {
                row: 2,
                column: 0,
                rows: 2,
                columns: 1
            })
        );
    }

    #[test]
    fn homology() {
        let c = complex();
        let h = c.homology();
        assert_eq!(h.degrees().collect::<Vec<_>>(), [0, 1, 2]);
        // H_0 = F / im(d_1) = 0, H_1 = ker(d_1) / im(d_2) = 0, H_2 = ker(d_2) = 0
        for n in 0..=2 {
            assert_eq!(h.free_dimension(n), 0, "degree {n}");
            assert_eq!(c.homology_at(n), HomologyRecord::single(n, h.kern(n), h.tors(n)));
        }

        let mut streamed = HomologyRecord::new();
        for n in c.degrees() {
            streamed.merge(c.kernel_and_torsion(n));
        }
        assert_eq!(streamed.kern(0), 1);
        assert_eq!(streamed.kern(1), 1);
        assert_eq!(streamed.tors(1), 1);
        assert_eq!(streamed.tors(0), 1);
        for n in h.degrees() {
            assert_eq!(streamed.free_dimension(n), h.free_dimension(n), "degree {n}");
        }
    }

    #[test]
    fn take_in_decreasing_degree() {
        let mut c = complex();
        let h = c.homology();
        let progress = AtomicUsize::new(0);
        let mut streamed = HomologyRecord::new();
        for n in [2, 1] {
            streamed.merge(c.take_kernel_and_torsion(n, &progress));
        }
        assert!(c.is_empty());
        assert_eq!(streamed.kern(0), 1);
        for n in h.degrees() {
            assert_eq!(streamed.kern(n), h.kern(n), "degree {n}");
            assert_eq!(streamed.tors(n), h.tors(n), "degree {n}");
        }
    }

    #[test]
    fn unreduced_entries_are_rejected() {
        let z = Zm::new(5, 1).unwrap();
        let mut c = ChainComplex::new(z.clone());
        c.set_differential(1, DenseMatrix::from_vec(z, &[vec![1, 1]]))
            .unwrap();
        assert_eq!(
            c.set_entry(1, 0, 0, 7),
            Err(FpError::UnreducedValue { value: 7, order: 5 })
        );
        assert_eq!(c.entry(1, 0, 0), Ok(1));
        assert_eq!(c.homology_at(0), HomologyRecord::single(0, 1, 1));

        c.set_entry(1, 0, 0, 4).unwrap();
        assert_eq!(c.homology_at(1), HomologyRecord::single(1, 1, 0));
    }

    #[test]
    fn extreme_degrees() {
        let f = Fp::new(P3);
        let mut c = ChainComplex::new(f);
        c.set_differential(i32::MIN, DenseMatrix::from_vec(f, &[vec![1, 1]]))
            .unwrap();
        c.set_differential(i32::MAX, DenseMatrix::from_vec(f, &[vec![1], vec![2]]))
            .unwrap();

        assert_eq!(c.dimension(i32::MIN), 2);
        assert_eq!(c.max_rank(i32::MIN), 1);
        assert_eq!(c.dimension(i32::MAX - 1), 2);
        assert_eq!(c.dimension(i32::MAX), 1);

        let h = c.homology();
        assert_eq!(
            h.degrees().collect::<Vec<_>>(),
            [i32::MIN, i32::MAX - 1, i32::MAX]
        );
        assert_eq!(h.free_dimension(i32::MIN), 1);
        assert_eq!(h.free_dimension(i32::MAX - 1), 1);
        assert_eq!(h.free_dimension(i32::MAX), 0);
        assert_eq!(c.homology_at(i32::MAX), HomologyRecord::single(i32::MAX, 0, 0));
        assert_eq!(c.homology_at(i32::MIN), HomologyRecord::single(i32::MIN, 1, 0));

        let streamed = c.kernel_and_torsion(i32::MIN);
        assert_eq!(streamed.kern(i32::MIN), 1);
        assert_eq!(streamed.degrees().collect::<Vec<_>>(), [i32::MIN]);

        let d = c.diagonalize_differential(i32::MIN).unwrap().unwrap();
        assert_eq!(d.rank(), 1);
        assert!(c.diagonalize_differential(i32::MAX).unwrap().is_some());
        assert_eq!(c.homology(), h);
    }

    #[test]
    fn take_kernel_and_torsion() {
        let mut c = complex();
        let progress = AtomicUsize::new(0);
        let h = c.take_kernel_and_torsion(2, &progress);
        assert_eq!(h.kern(2), 0);
        assert_eq!(h.tors(1), 1);
        assert!(!c.contains(2));
        assert_eq!(progress.into_inner(), 1);
    }

    #[test]
    fn rejects_foreign_field() {
        let mut c = complex();
        let m = DenseMatrix::new(Fp::new(P3), 1, 1);
        assert!(c.set_differential(5, m).is_ok());

        let z = Zm::new(3, 1).unwrap();
        let mut other = ChainComplex::new(z.clone());
        let foreign = DenseMatrix::new(Zm::new(5, 1).unwrap(), 1, 1);
        assert_eq!(
            other.set_differential(0, foreign),
            Err(FpError::FieldMismatch)
        );
        assert!(other.set_differential(0, DenseMatrix::new(z, 1, 1)).is_ok());
    }
}
