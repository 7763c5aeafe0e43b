use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

/// The homology of a chain complex over a field, one module per degree.
///
/// Over a field, the homology module `H_n` is determined by the dimension of the kernel of the
/// outgoing differential `d_n` and the rank of the incoming differential `d_{n+1}`. The latter is
/// called the torsion of degree `n`. Absent entries count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomologyRecord {
    kern: BTreeMap<i32, usize>,
    tors: BTreeMap<i32, usize>,
}

impl HomologyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record holding a single homology module.
    pub fn single(n: i32, kern: usize, tors: usize) -> Self {
        let mut result = Self::new();
        result.set_kern(n, kern);
        result.set_tors(n, tors);
        result
    }

    pub fn set_kern(&mut self, n: i32, k: usize) {
        self.kern.insert(n, k);
    }

    pub fn set_tors(&mut self, n: i32, t: usize) {
        self.tors.insert(n, t);
    }

    pub fn kern(&self, n: i32) -> usize {
        self.kern.get(&n).copied().unwrap_or_default()
    }

    pub fn tors(&self, n: i32) -> usize {
        self.tors.get(&n).copied().unwrap_or_default()
    }

    pub fn erase_kern(&mut self, n: i32) -> Option<usize> {
        self.kern.remove(&n)
    }

    pub fn erase_tors(&mut self, n: i32) -> Option<usize> {
        self.tors.remove(&n)
    }

    /// The dimension of `H_n`. This is negative only if the differentials do not compose to zero.
    pub fn free_dimension(&self, n: i32) -> i64 {
        self.kern(n) as i64 - self.tors(n) as i64
    }

    /// All degrees with a kernel or torsion entry, in increasing order.
    pub fn degrees(&self) -> impl Iterator<Item = i32> + '_ {
        self.kern
            .keys()
            .chain(self.tors.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
    }

    pub fn is_empty(&self) -> bool {
        self.kern.is_empty() && self.tors.is_empty()
    }

    /// Copies all entries of `other` into `self`, overwriting existing ones.
    pub fn merge(&mut self, other: Self) {
        self.kern.extend(other.kern);
        self.tors.extend(other.tors);
    }
}

/// Prints every degree that has a kernel entry. The alternate form also prints the kernel and
/// torsion.
impl fmt::Display for HomologyRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &n in self.kern.keys() {
            writeln!(f, "Homology module H_{n}")?;
            writeln!(f, "{:-<35}", "")?;
            writeln!(f, "Dimension = {}", self.free_dimension(n))?;
            if f.alternate() {
                writeln!(f, "dim(ker) = {}; dim(im) = {}", self.kern(n), self.tors(n))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;

    #[test]
    fn test_display() {
        let mut h = HomologyRecord::single(1, 5, 2);
        h.set_kern(-1, 3);
        h.set_tors(4, 1);

        expect![[r#"
            Homology module H_-1
            -----------------------------------
            Dimension = 3

            Homology module H_1
            -----------------------------------
            Dimension = 3

        "#]]
        .assert_eq(&h.to_string());

        expect![[r#"
            Homology module H_-1
            -----------------------------------
            Dimension = 3
            dim(ker) = 3; dim(im) = 0

            Homology module H_1
            -----------------------------------
            Dimension = 3
            dim(ker) = 5; dim(im) = 2

        "#]]
        .assert_eq(&format!("{h:#}"));

        assert_eq!(HomologyRecord::new().to_string(), "");
    }

    #[test]
    fn test_accessors() {
        let mut h = HomologyRecord::new();
        assert!(h.is_empty());
        assert_eq!(h.kern(3), 0);

        h.set_kern(3, 4);
        h.set_tors(2, 1);
        h.set_tors(3, 6);
        assert_eq!(h.free_dimension(3), -2);
        assert_eq!(h.degrees().collect::<Vec<_>>(), [2, 3]);

        assert_eq!(h.erase_tors(3), Some(6));
        assert_eq!(h.erase_tors(3), None);
        assert_eq!(h.free_dimension(3), 4);
        assert_eq!(h.erase_kern(3), Some(4));
        assert_eq!(h.degrees().collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn test_merge_and_serde() {
        let mut h = HomologyRecord::single(0, 2, 0);
        let mut other = HomologyRecord::single(1, 1, 1);
        other.set_kern(0, 3);
        h.merge(other);
        assert_eq!(h.kern(0), 3);
        assert_eq!(h.tors(1), 1);

        let json = serde_json::to_string(&h).unwrap();
        expect![[r#"{"kern":{"0":3,"1":1},"tors":{"0":0,"1":1}}"#]].assert_eq(&json);
        assert_eq!(serde_json::from_str::<HomologyRecord>(&json).unwrap(), h);
    }
}
