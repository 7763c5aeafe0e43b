use expect_test::expect;
use fp::{
    field::{Field, Fp, Zm},
    matrix::DenseMatrix,
    prime::P5,
};
use homology::{ChainComplex, Diagonalizer, HomologyRecord};
use rstest::rstest;

/// The complex `F^2 -> F^4 -> F^4` over `F_5`. The entries are given as integers and reduced.
fn reference_complex(diagonalizer: Diagonalizer) -> ChainComplex<Fp<P5>> {
    let f = Fp::new(P5);
    let mut complex = ChainComplex::with_diagonalizer(f, diagonalizer);
    complex
        .set_differential(
            1,
            DenseMatrix::from_vec(
                f,
                &[
                    vec![1, 1, 2, 3],
                    vec![0, 0, 0, 0],
                    vec![1, 0, 5, 7],
                    vec![0, 0, 0, 0],
                ],
            ),
        )
        .unwrap();
    complex
        .set_differential(
            2,
            DenseMatrix::from_vec(f, &[vec![-15, -7], vec![9, 4], vec![3, 0], vec![0, 1]]),
        )
        .unwrap();
    complex
}

fn composite_is_zero<F: Field>(complex: &ChainComplex<F>, n: i32) -> bool {
    let d = complex.differential_or_zero(n);
    let e = complex.differential_or_zero(n + 1);
    (&*d * &*e).is_zero()
}

#[test]
fn reference_complex_is_a_complex() {
    let complex = reference_complex(Diagonalizer::sequential());
    assert!(composite_is_zero(&complex, 1));
    expect![[r#"
        [
            [0, 3],
            [4, 4],
            [3, 0],
            [0, 1]
        ]"#]]
    .assert_eq(&complex.differential(2).unwrap().to_string());
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(4)]
fn reference_homology(#[case] num_threads: usize) {
    let complex = reference_complex(Diagonalizer::new(num_threads));
    let h = complex.homology();

    assert_eq!(h.free_dimension(0), 2);
    assert_eq!(h.free_dimension(1), 0);
    assert_eq!(h.free_dimension(2), 0);
    assert_eq!(complex.homology_at(0), HomologyRecord::single(0, 4, 2));

    expect![[r#"
        Homology module H_0
        -----------------------------------
        Dimension = 2
        dim(ker) = 4; dim(im) = 2

        Homology module H_1
        -----------------------------------
        Dimension = 0
        dim(ker) = 2; dim(im) = 2

        Homology module H_2
        -----------------------------------
        Dimension = 0
        dim(ker) = 0; dim(im) = 0

    "#]]
    .assert_eq(&format!("{h:#}"));
}

#[test]
fn streaming_matches_homology() {
    let mut complex = reference_complex(Diagonalizer::new(2));
    let expected = complex.homology();

    let progress = Default::default();
    let degrees: Vec<i32> = complex.degrees().collect();
    let mut streamed = HomologyRecord::new();
    for n in degrees {
        streamed.merge(complex.take_kernel_and_torsion(n, &progress));
    }
    assert!(complex.is_empty());

    for n in 0..=2 {
        assert_eq!(streamed.free_dimension(n), expected.free_dimension(n), "degree {n}");
    }
}

#[rstest]
#[case(1)]
#[case(2)]
fn diagonalizing_preserves_homology(#[case] n: i32) {
    let mut complex = reference_complex(Diagonalizer::new(3));
    let before = complex.homology();

    let d = complex.diagonalize_differential(n).unwrap().unwrap();
    assert_eq!(d.rank(), 2);
    assert!(composite_is_zero(&complex, 1));
    assert_eq!(complex.homology(), before);

    assert_eq!(complex.diagonalize_differential(7), Ok(None));
}

#[test]
fn homology_over_prime_power() {
    // Multiplication by 3 on Z/9 is not invertible, so it has no pivot.
    let z = Zm::new(3, 2).unwrap();
    let mut complex = ChainComplex::new(z.clone());
    complex
        .set_differential(1, DenseMatrix::from_vec(z.clone(), &[vec![3, 1]]))
        .unwrap();
    complex
        .set_differential(2, DenseMatrix::from_vec(z, &[vec![3], vec![0]]))
        .unwrap();

    let h = complex.homology();
    assert_eq!(h.kern(1), 1);
    assert_eq!(h.tors(1), 0);
    assert_eq!(h.free_dimension(0), 0);
}

#[test]
fn serde_keeps_differentials() {
    let complex = reference_complex(Diagonalizer::new(2));
    let json = serde_json::to_string(&complex).unwrap();
    let restored: ChainComplex<Fp<P5>> = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.diagonalizer(), Diagonalizer::sequential());
    assert_eq!(restored.differential(1), complex.differential(1));
    assert_eq!(restored.homology(), complex.homology());
}
