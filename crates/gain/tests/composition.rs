//! Properties of the imputation composition `M ⊙ X + (1 - M) ⊙ G`.

use gain::prelude::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn matrix_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix> {
    prop::collection::vec(-100.0f64..100.0, rows * cols)
        .prop_map(move |data| Matrix::from_row_slice(rows, cols, &data))
}

fn mask_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix> {
    prop::collection::vec(prop::bool::ANY, rows * cols).prop_map(move |bits| {
        Matrix::from_row_slice(
            rows,
            cols,
            &bits.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect::<Vec<_>>(),
        )
    })
}

proptest! {
    #[test]
    fn prop_compose_selects_by_mask(
        x in matrix_strategy(4, 6),
        g in matrix_strategy(4, 6),
        mask in mask_strategy(4, 6),
    ) {
        let x_hat = compose(&mask, &x, &g).unwrap();
        for i in 0..4 {
            for j in 0..6 {
                if mask[(i, j)] == 1.0 {
                    prop_assert_eq!(x_hat[(i, j)], x[(i, j)]);
                } else {
                    prop_assert_eq!(x_hat[(i, j)], g[(i, j)]);
                }
            }
        }
    }

    #[test]
    fn prop_generator_output_composes_exactly(
        x in matrix_strategy(3, 4),
        mask in mask_strategy(3, 4),
        seed in 0u64..1000,
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let generator = Generator::new(4, None, &mut rng).unwrap();
        let observed = x.component_mul(&mask);
        let generated = generator.generate(&observed, &mask).unwrap();
        let x_hat = compose(&mask, &x, &generated).unwrap();

        for ((h, (xv, gv)), m) in x_hat.iter().zip(x.iter().zip(generated.iter())).zip(mask.iter()) {
            let expected = if *m == 1.0 { *xv } else { *gv };
            prop_assert_eq!(*h, expected);
        }
    }
}
