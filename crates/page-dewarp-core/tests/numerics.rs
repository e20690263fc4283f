use approx::assert_relative_eq;
use nalgebra::Point2;
use page_dewarp_core::{
    median_fit_error, median_variation, quadratic_fit, rank_value, sort_indices, KeyIndex,
    Normalizer, ParamLayout, SortOrder, SortStrategy,
};

/// Deterministic pseudo-random integers in `0..range`, with plenty of ties.
fn lcg_values(n: usize, range: u64) -> Vec<f64> {
    let mut state = 0x2545_f491_4f6c_dd1d_u64;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) % range) as f64
        })
        .collect()
}

#[test]
fn bin_sort_matches_comparison_sort_on_integer_data() {
    let values = lcg_values(2000, 97);
    for order in [SortOrder::Ascending, SortOrder::Descending] {
        let bins = sort_indices(&values, order, SortStrategy::Bins);
        let cmp = sort_indices(&values, order, SortStrategy::Comparison);
        assert_eq!(bins, cmp, "{order:?}");
    }
}

#[test]
fn rank_values_agree_across_strategies() {
    let values = lcg_values(501, 1000);
    for fraction in [0.0, 0.1, 0.25, 0.5, 0.9, 1.0] {
        assert_eq!(
            rank_value(&values, fraction, SortStrategy::Bins),
            rank_value(&values, fraction, SortStrategy::Comparison)
        );
    }
}

#[test]
fn median_variation_of_a_symmetric_sample() {
    let (med, mad) = median_variation(&[1.0, 2.0, 3.0, 4.0, 5.0]).expect("non-empty");
    assert_eq!(med, 3.0);
    assert_eq!(mad, 1.0);
}

#[test]
fn quadratic_fit_recovers_a_pixel_scale_parabola() {
    let points: Vec<Point2<f64>> = (0..12)
        .map(|i| {
            let x = 300.0 + 35.0 * i as f64;
            Point2::new(x, 2e-4 * x * x - 0.1 * x + 40.0)
        })
        .collect();
    let fit = quadratic_fit(&points).expect("fit");
    assert_relative_eq!(fit.a, 2e-4, max_relative = 1e-6);
    assert_relative_eq!(fit.b, -0.1, max_relative = 1e-6);
    assert_relative_eq!(fit.c, 40.0, max_relative = 1e-6);
    let err = median_fit_error(&points, |x| fit.eval(x)).expect("error");
    assert!(err < 1e-6);
}

#[test]
fn normalizer_maps_the_long_axis_to_unit_range() {
    let n = Normalizer::new(800, 600);
    let left = n.pix_to_norm(Point2::new(0.0, 300.0));
    let right = n.pix_to_norm(Point2::new(800.0, 300.0));
    assert_relative_eq!(left.x, -1.0);
    assert_relative_eq!(right.x, 1.0);
    assert_relative_eq!(left.y, 0.0);

    let p = Point2::new(123.25, 457.5);
    let back = n.norm_to_pix(n.pix_to_norm(p));
    assert_relative_eq!(back.x, p.x, epsilon = 1e-9);
    assert_relative_eq!(back.y, p.y, epsilon = 1e-9);
}

#[test]
fn layout_key_indices_never_touch_the_fixed_block() {
    let layout = ParamLayout::new(3, 10);
    assert_eq!(layout.param_count(), ParamLayout::FIXED + 13);
    for k in 0..10 {
        let KeyIndex { x, y } = layout.key_index(k % 3, k);
        assert!(layout.columns().contains(&x));
        assert!(layout.span_offsets().contains(&y));
    }
    assert!(!layout.columns().contains(&KeyIndex::ANCHOR.x));
}
