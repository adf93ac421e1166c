use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fairing::{FairingShapeSolver, InlineTop, ManualShape, RadialProfile, SolveWarning};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}

fn profile(samples: &[f64]) -> RadialProfile {
    RadialProfile::from_samples(samples.to_vec(), 0.0, 0.1)
}

#[test]
fn payload_inside_base_needs_no_base_cone() {
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&[0.6, 0.6, 0.6]), 0.625, None, None);
    let env = out.envelope;
    assert_eq!(env.cylinder_start, 0.0);
    assert_eq!(env.max_radius, 0.625);
    assert!(approx_eq(env.cylinder_end, 0.3, 1e-12));
    assert!(out.warnings.is_empty());
}

#[test]
fn wide_payload_at_origin_blocks_the_base_cone() {
    // The first slab already exceeds the base radius, so no cone height encloses it.
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&[0.6, 0.6, 0.6]), 0.5, None, None);
    let env = out.envelope;
    assert_eq!(env.max_radius, 0.6);
    assert_eq!(env.cylinder_start, 0.0);
    assert!(approx_eq(env.cylinder_end, 0.3, 1e-12));
}

#[test]
fn base_cone_climbs_while_it_encloses_and_stays_steep() {
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&[0.5, 0.52, 0.6, 0.6, 0.6]), 0.5, None, None);
    let env = out.envelope;
    assert_eq!(env.max_radius, 0.6);
    // At 0.3 the slope (0.1 / 0.3) drops below tan(20°).
    assert!(approx_eq(env.cylinder_start, 0.2, 1e-12));
    let slope = (env.max_radius - env.base_radius) / env.cylinder_start;
    assert!(slope >= 20f64.to_radians().tan());
}

#[test]
fn last_valid_cylinder_start_wins() {
    let samples = [0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.9];
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&samples), 0.5, None, None);
    assert!(approx_eq(out.envelope.cylinder_start, 0.6, 1e-12));
    // The widest slab sits on top, so the nose cannot start lower.
    assert!(approx_eq(out.envelope.cylinder_end, 0.7, 1e-12));
}

#[test]
fn nose_cone_drops_to_the_lowest_enclosing_height() {
    // Radii shrink faster than the nose taper (0.05 per slab).
    let samples = [0.8, 0.8, 0.8, 0.7, 0.6, 0.5];
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&samples), 0.8, None, None);
    assert!(approx_eq(out.envelope.cylinder_end, 0.3, 1e-12));
}

#[test]
fn auto_solution_is_reported_for_write_back() {
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&[0.5, 0.52, 0.6, 0.6, 0.6]), 0.5, None, None);
    assert_eq!(
        out.auto,
        ManualShape {
            max_size: out.envelope.max_radius * 2.0,
            cyl_start: out.envelope.cylinder_start,
            cyl_end: out.envelope.cylinder_end,
        }
    );
}

#[test]
fn inline_fit_ignores_payload_above_the_top() {
    let samples = [0.4, 0.4, 0.4, 0.4, 2.0, 2.0];
    let top = InlineTop { radius: 0.45, height: 0.4 };
    let out = FairingShapeSolver::new(20.0, 2.0).solve(&profile(&samples), 0.5, Some(top), None);
    let env = out.envelope;
    assert_eq!(env.max_radius, 0.5);
    assert_eq!(env.cylinder_start, 0.0);
    assert!(env.cylinder_end <= top.height);
    assert_eq!(env.inline, Some(top));
}

#[test]
fn inline_top_below_origin_is_flagged() {
    let p = RadialProfile::from_samples(vec![0.4], 1.0, 0.1);
    let top = InlineTop { radius: 0.4, height: 0.5 };
    let out = FairingShapeSolver::default().solve(&p, 0.5, Some(top), None);
    assert!(out.warnings.contains(&SolveWarning::TopBelowOrigin { top: 0.5, origin: 1.0 }));
}

#[test]
fn random_profiles_keep_cylinder_ordered_and_base_cone_steep() {
    let mut rng = StdRng::seed_from_u64(0x00fa_1e55);
    let min_tan = 20f64.to_radians().tan();
    for _ in 0..500 {
        let len = rng.random_range(1..40);
        let samples: Vec<f64> = (0..len).map(|_| rng.random_range(0.0..2.0)).collect();
        let base_radius = rng.random_range(0.1..1.5);
        let p = profile(&samples);
        let out = FairingShapeSolver::new(20.0, rng.random_range(0.5..3.0)).solve(&p, base_radius, None, None);
        let env = out.envelope;

        assert!(env.cylinder_start <= env.cylinder_end, "{env:?}");
        assert!(env.max_radius >= env.base_radius);
        if env.cylinder_start > p.origin() {
            let slope = (env.max_radius - env.base_radius) / env.cylinder_start;
            assert!(slope >= min_tan - 1e-12, "slope {slope} for {env:?}");
        }
        if out.warnings.is_empty() && env.max_radius > env.base_radius {
            let k = (env.max_radius - env.base_radius) / env.cylinder_start.max(f64::MIN_POSITIVE);
            for (j, &r) in samples.iter().enumerate() {
                if p.slab_bottom(j) + 1e-9 >= env.cylinder_start {
                    break;
                }
                assert!(r <= env.base_radius + k * p.slab_bottom(j) + 1e-9, "slab {j} pokes through {env:?}");
            }
        }
    }
}

#[test]
fn manual_mode_is_clamped_whatever_the_input() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let manual = ManualShape {
            max_size: rng.random_range(0.5..4.0),
            cyl_start: rng.random_range(0.0..5.0),
            cyl_end: rng.random_range(0.0..5.0),
        };
        let out = FairingShapeSolver::default().solve(&profile(&[0.5]), 0.4, None, Some(manual));
        assert!(out.envelope.cylinder_start <= out.envelope.cylinder_end);
        let clamped = manual.cyl_start > manual.cyl_end;
        assert_eq!(clamped, !out.warnings.is_empty());
    }
}
