use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::fairing::{
    ColliderFilter, ColliderRecord, ColliderShape, PartArena, PartId, PartRecord, PayloadProfileScanner,
};
use crate::geom::{Point3, Transform, Vec3};

fn boxed(center: Point3, size: Vec3) -> ColliderRecord {
    ColliderRecord::new(ColliderShape::Box { center, size })
}

/// Base with a `top` node at 0.1 and one payload box from 0.1 to 0.9.
fn stack(at: Transform) -> (PartArena, PartId, PartId) {
    let mut arena = PartArena::new();
    let base = arena.push(
        PartRecord::new("fairingBase")
            .at(at)
            .with_node("top", Point3::new(0.0, 0.1, 0.0))
            .with_node("interstage01", Point3::new(0.0, 0.5, 0.0)),
    );
    let payload = arena.push(
        PartRecord::new("probe")
            .at(at)
            .with_collider(boxed(Point3::new(0.0, 0.5, 0.0), Vec3::new(0.6, 0.8, 0.6))),
    );
    assert!(arena.attach(base, "top", payload));
    (arena, base, payload)
}

#[test]
fn box_payload_covers_every_slab() {
    let (arena, base, payload) = stack(Transform::identity());
    let filter = ColliderFilter::default();
    let scan = PayloadProfileScanner::new(base, 0.05, &filter).scan(&arena).expect("scan");
    assert_eq!(scan.payload, vec![payload]);
    assert!(scan.targets.is_empty());
    assert_eq!(scan.samples_folded, 1);
    assert_eq!(scan.profile.origin(), 0.1);
    assert_eq!(scan.profile.len(), 8);
    let corner = 0.18f64.sqrt() + 0.05;
    for (i, r) in scan.profile.samples().iter().enumerate() {
        assert!((r - corner).abs() < 1e-9, "slab {i}: {r}");
    }
}

#[test]
fn profile_is_taken_in_the_base_frame() {
    let (arena, base, _) = stack(Transform::translate(Vec3::new(3.0, 10.0, -2.0)));
    let filter = ColliderFilter::default();
    let moved = PayloadProfileScanner::new(base, 0.0, &filter).scan(&arena).expect("scan");
    let (arena, base, _) = stack(Transform::identity());
    let local = PayloadProfileScanner::new(base, 0.0, &filter).scan(&arena).expect("scan");
    assert_eq!(moved.profile.len(), local.profile.len());
    for (a, b) in moved.profile.samples().iter().zip(local.profile.samples()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn denylisted_colliders_are_skipped() {
    let (mut arena, base, payload) = stack(Transform::identity());
    if let Some(part) = arena.get_mut(payload) {
        part.colliders.push(
            ColliderRecord::new(ColliderShape::Sphere { center: Point3::new(0.0, 0.5, 0.0), radius: 5.0 })
                .with_tag("LadderCollider"),
        );
        part.colliders.push(
            ColliderRecord::new(ColliderShape::Sphere { center: Point3::new(0.0, 0.5, 0.0), radius: 4.0 })
                .with_tag("AirlockTrigger"),
        );
    }
    let filter = ColliderFilter::default();
    let scan = PayloadProfileScanner::new(base, 0.0, &filter).scan(&arena).expect("scan");
    assert_eq!(scan.samples_folded, 1);
    assert!(scan.profile.max() < 1.0);

    let permissive = ColliderFilter::new::<&str>(&[]);
    let scan = PayloadProfileScanner::new(base, 0.0, &permissive).scan(&arena).expect("scan");
    assert_eq!(scan.samples_folded, 3);
    assert!(scan.profile.max() > 5.0);
}

#[test]
fn disabled_colliders_are_skipped() {
    let (mut arena, base, payload) = stack(Transform::identity());
    if let Some(part) = arena.get_mut(payload) {
        let mut hidden = boxed(Point3::new(0.0, 0.5, 0.0), Vec3::new(8.0, 0.2, 8.0));
        hidden.enabled = false;
        part.colliders.push(hidden);
    }
    let filter = ColliderFilter::default();
    let scan = PayloadProfileScanner::new(base, 0.0, &filter).scan(&arena).expect("scan");
    assert!(scan.profile.max() < 1.0);
}

#[test]
fn nested_base_becomes_a_target_and_stops_the_walk() {
    let (mut arena, base, payload) = stack(Transform::identity());
    let nested = arena.push(
        PartRecord::new("innerBase")
            .at(Transform::translate(Vec3::new(0.0, 1.2, 0.0)))
            .with_fairing_base(1.25)
            .with_node("top", Point3::new(0.0, 0.1, 0.0))
            .with_collider(boxed(Point3::ORIGIN, Vec3::new(3.0, 0.2, 3.0))),
    );
    let above = arena.push(
        PartRecord::new("upperStage").with_collider(boxed(Point3::new(0.0, 2.0, 0.0), Vec3::new(6.0, 1.0, 6.0))),
    );
    arena.link(payload, nested);
    assert!(arena.attach(nested, "top", above));

    let filter = ColliderFilter::default();
    let scan = PayloadProfileScanner::new(base, 0.0, &filter).scan(&arena).expect("scan");
    assert_eq!(scan.payload, vec![payload]);
    assert_eq!(scan.targets, vec![nested]);
    assert!(scan.profile.max() < 1.0);
    let h = scan.target_height(&arena, nested).expect("height");
    assert!((h - 1.2).abs() < 1e-12);
}

#[test]
fn interstage_nodes_seed_the_walk() {
    let mut arena = PartArena::new();
    let base = arena.push(PartRecord::new("adapter").with_node("interstage01", Point3::new(0.0, 0.3, 0.0)));
    let engine = arena.push(
        PartRecord::new("engine").with_collider(boxed(Point3::new(0.0, 0.3, 0.0), Vec3::new(0.4, 0.4, 0.4))),
    );
    assert!(arena.attach(base, "interstage01", engine));
    let filter = ColliderFilter::default();
    let scan = PayloadProfileScanner::new(base, 0.0, &filter).scan(&arena).expect("scan");
    assert_eq!(scan.payload, vec![engine]);
    // No top node: the profile starts at the base origin.
    assert_eq!(scan.profile.origin(), 0.0);
    assert_eq!(scan.profile.len(), 5);
}

#[test]
fn empty_payload_leaves_a_single_floor_sample() {
    let mut arena = PartArena::new();
    let base = arena.push(PartRecord::new("fairingBase").with_node("top", Point3::new(0.0, 0.1, 0.0)));
    let filter = ColliderFilter::default();
    let scan = PayloadProfileScanner::new(base, 0.15, &filter).scan(&arena).expect("scan");
    assert!(scan.payload.is_empty());
    assert_eq!(scan.profile.samples(), &[0.15]);
}

#[test]
fn unknown_base_is_an_error() {
    let arena = PartArena::new();
    let filter = ColliderFilter::default();
    assert!(PayloadProfileScanner::new(PartId(3), 0.0, &filter).scan(&arena).is_err());
}

#[test]
fn random_payloads_are_fully_covered() {
    let mut rng = StdRng::seed_from_u64(0x5ca1_ab1e);
    let filter = ColliderFilter::default();
    for _ in 0..50 {
        let mut arena = PartArena::new();
        let base = arena.push(PartRecord::new("fairingBase").with_node("top", Point3::new(0.0, 0.1, 0.0)));
        let mut part = PartRecord::new("payload");
        let mut corners = Vec::new();
        for _ in 0..rng.random_range(1..6) {
            let center = Point3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(0.2..3.0),
                rng.random_range(-1.0..1.0),
            );
            let size = Vec3::new(
                rng.random_range(0.05..1.0),
                rng.random_range(0.05..1.0),
                rng.random_range(0.05..1.0),
            );
            corners.extend(crate::geom::BBox::from_center_size(center, size).corners());
            part = part.with_collider(boxed(center, size));
        }
        let payload = arena.push(part);
        assert!(arena.attach(base, "top", payload));

        let extra = rng.random_range(0.0..0.2);
        let scan = PayloadProfileScanner::new(base, extra, &filter).scan(&arena).expect("scan");
        let profile = &scan.profile;
        for p in corners {
            if let Some(slab) = profile.slab_of(p.y) {
                assert!(profile.samples()[slab] + 1e-9 >= p.radial() + extra, "corner {p:?} escapes slab {slab}");
            }
        }
    }
}
