use crate::fairing::{
    BaseConfig, BaseMode, ColliderRecord, ColliderShape, FairingBase, FairingError, FairingSide, InlineTop,
    ManualShape, NodeLayoutError, PartArena, PartId, PartRecord, PresetError, ShapeConsumer, ShapePresetTable,
    SideControls,
};
use crate::geom::{Point3, Vec3};

fn arena() -> (PartArena, PartId) {
    let mut arena = PartArena::new();
    let base = arena.push(PartRecord::new("fairingBase").with_node("top", Point3::new(0.0, 0.1, 0.0)));
    let payload = arena.push(PartRecord::new("probe").with_collider(ColliderRecord::new(ColliderShape::Box {
        center: Point3::new(0.0, 0.5, 0.0),
        size: Vec3::new(0.6, 0.8, 0.6),
    })));
    assert!(arena.attach(base, "top", payload));
    (arena, base)
}

fn with_two_sides(base: PartId, config: BaseConfig) -> FairingBase {
    let mut fairing = FairingBase::new(base, config);
    fairing.attach_side(0, FairingSide::new(SideControls::default())).expect("slot 0");
    fairing.attach_side(1, FairingSide::new(SideControls::default())).expect("slot 1");
    fairing
}

#[test]
fn edits_between_ticks_collapse_into_one_pass() {
    let (arena, base) = arena();
    let mut fairing = with_two_sides(base, BaseConfig::default());
    let first = fairing.tick(&arena).expect("tick").expect("first pass");
    assert!(first.rescanned);
    assert_eq!(first.merged_requests, 3);
    assert_eq!(first.sides_rebuilt, 2);

    fairing.edit_config(|c| c.extra_height = 0.2);
    fairing
        .edit_side(0, |side| side.controls.collider_shave_angle = 10.0)
        .expect("side 0");
    fairing.edit_config(|c| c.extra_radius = 0.1);
    assert!(fairing.is_dirty());

    let report = fairing.tick(&arena).expect("tick").expect("second pass");
    assert_eq!(report.merged_requests, 3);
    assert!(report.rescanned);
    assert_eq!(fairing.rebuild_passes(), 2);
    assert_eq!(fairing.side(0).map(FairingSide::rebuild_count), Some(2));
    assert_eq!(fairing.side(0).map(|s| s.controls.collider_shave_angle), Some(10.0));
    let widest = fairing.scan().expect("scan").profile.max();
    assert!((widest - (0.18f64.sqrt() + 0.1)).abs() < 1e-9);

    assert!(fairing.tick(&arena).expect("tick").is_none());
    assert_eq!(fairing.rebuild_passes(), 2);
}

#[test]
fn shape_edits_reuse_the_cached_scan() {
    let (arena, base) = arena();
    let mut fairing = with_two_sides(base, BaseConfig::default());
    fairing.tick(&arena).expect("tick");
    fairing.shape_changed();
    let report = fairing.tick(&arena).expect("tick").expect("pass");
    assert!(!report.rescanned);
    assert_eq!(report.merged_requests, 1);
}

#[test]
fn adapter_base_is_always_inline() {
    let (arena, base) = arena();
    let config = BaseConfig {
        mode: BaseMode::Adapter,
        top_size: 1.0,
        height: 1.0,
        ..BaseConfig::default()
    };
    let mut fairing = with_two_sides(base, config);
    let report = fairing.tick(&arena).expect("tick").expect("pass");
    assert_eq!(report.envelope.inline, Some(InlineTop { radius: 0.4375, height: 1.0 }));
    assert!(fairing.contour().expect("contour").is_inline());
    let geo = fairing.side_geometry(0).expect("geometry");
    assert!(geo.counts.inline);
    assert_eq!(geo.mesh.vertex_count(), geo.counts.total_vertices());
}

#[test]
fn node_count_cannot_change_while_sides_are_attached() {
    let (_, base) = arena();
    let mut fairing = with_two_sides(base, BaseConfig::default());
    assert_eq!(
        fairing.set_side_node_count(3),
        Err(FairingError::NodeLayout(NodeLayoutError::PartsAttached))
    );
    assert_eq!(fairing.nodes().num_nodes(), 2);

    assert!(fairing.detach_side(0).is_some());
    assert!(fairing.detach_side(1).is_some());
    fairing.set_side_node_count(3).expect("no sides attached");
    assert_eq!(fairing.nodes().num_nodes(), 3);
    assert!(fairing.attach_side(2, FairingSide::new(SideControls::default())).is_ok());
}

#[test]
fn slot_errors_are_reported() {
    let (_, base) = arena();
    let mut fairing: FairingBase = FairingBase::new(base, BaseConfig::default());
    assert_eq!(
        fairing.attach_side(5, FairingSide::default()).err(),
        Some(FairingError::SlotOutOfRange { slot: 5, count: 2 })
    );
    assert_eq!(fairing.edit_side(1, |_| ()).err(), Some(FairingError::EmptySlot(1)));
}

#[test]
fn locked_sides_keep_their_geometry() {
    let (arena, base) = arena();
    let locked = SideControls { shape_lock: true, ..SideControls::default() };
    let mut fairing = FairingBase::new(base, BaseConfig::default());
    fairing.attach_side(0, FairingSide::new(SideControls::default())).expect("slot 0");
    fairing.attach_side(1, FairingSide::new(locked)).expect("slot 1");
    let report = fairing.tick(&arena).expect("tick").expect("pass");
    assert_eq!(report.sides_rebuilt, 1);
    assert!(fairing.side_geometry(0).is_some());
    assert!(fairing.side_geometry(1).is_none());
    assert!(fairing.side(1).is_some_and(ShapeConsumer::is_shape_locked));
}

#[test]
fn outline_is_previewed_only_without_sides() {
    let (arena, base) = arena();
    let mut fairing: FairingBase = FairingBase::new(base, BaseConfig::default());
    let report = fairing.tick(&arena).expect("tick").expect("pass");
    assert_eq!(report.sides_rebuilt, 0);
    let outline = fairing.fairing_outline().expect("preview outline");
    assert_eq!(outline.len(), report.contour_len);
    assert!(!fairing.profile_outline().is_empty());

    fairing.attach_side(0, FairingSide::new(SideControls::default())).expect("slot 0");
    assert!(fairing.fairing_outline().is_none());
}

#[test]
fn presets_overwrite_the_cone_controls() {
    let (arena, base) = arena();
    let table = ShapePresetTable::builtin();
    let mut fairing = with_two_sides(base, BaseConfig::default());
    fairing.apply_preset(0, &table, "Ogive").expect("preset");
    fairing.tick(&arena).expect("tick");

    let ogive = table.get("Ogive").expect("builtin");
    let lead = fairing.side(0).map(FairingSide::controls).expect("side 0");
    assert_eq!(lead.cone.nose_cone_shape, ogive.nose_cone_shape);
    assert_eq!(lead.cone.nose_cone_segments, 11);
    // The lead's cone is pushed to every side.
    let other = fairing.side(1).map(FairingSide::controls).expect("side 1");
    assert_eq!(other.cone, lead.cone);

    match fairing.apply_preset(0, &table, "ogiv") {
        Err(FairingError::Preset(PresetError::Unknown { suggestion, .. })) => {
            assert_eq!(suggestion.as_deref(), Some("Ogive"));
        }
        other => panic!("expected unknown preset, got {other:?}"),
    }
}

#[test]
fn toggling_auto_shape_resets_the_cone_on_the_next_tick() {
    let (arena, base) = arena();
    let mut prefab = SideControls::default();
    ShapePresetTable::builtin().get("Conic").expect("builtin").apply(&mut prefab);
    let prefab = prefab.cone;

    let mut fairing = with_two_sides(base, BaseConfig::default());
    fairing.set_auto_shape(0, None, Some(false), &prefab).expect("nose off");
    fairing
        .edit_side(0, |side| side.controls.cone.nose_cone_segments = 3)
        .expect("side 0");
    fairing.tick(&arena).expect("tick");
    let lead = fairing.side(0).map(FairingSide::controls).expect("side 0");
    assert_eq!(lead.cone.nose_cone_segments, 3);
    // The base flag stayed on, so the base cone was reset as well.
    assert_eq!(lead.cone.base_cone_segments, prefab.base_cone_segments);
    assert_eq!(fairing.side(1).map(|s| s.controls.cone.nose_cone_segments), Some(3));
    let before = fairing.side(1).and_then(FairingSide::geometry).map(|g| g.contour.len()).expect("built");

    fairing.set_auto_shape(0, None, Some(true), &prefab).expect("nose on");
    assert!(fairing.is_dirty());
    assert_eq!(fairing.side(1).map(|s| s.controls.cone.nose_cone_segments), Some(3));

    let report = fairing.tick(&arena).expect("tick").expect("pass");
    assert_eq!(report.sides_rebuilt, 2);
    assert!(!report.rescanned);
    for (slot, side) in fairing.sides() {
        assert_eq!(side.controls.cone.nose_cone_shape, prefab.nose_cone_shape, "side {slot}");
        assert_eq!(side.controls.cone.nose_cone_segments, prefab.nose_cone_segments, "side {slot}");
        assert_eq!(side.controls.cone.nose_height_ratio, prefab.nose_height_ratio, "side {slot}");
    }
    let after = fairing.side(1).and_then(FairingSide::geometry).map(|g| g.contour.len()).expect("built");
    assert_eq!(after - before, (prefab.nose_cone_segments - 3) as usize);
    assert!(matches!(
        fairing.set_auto_shape(5, Some(true), None, &prefab),
        Err(FairingError::SlotOutOfRange { .. } | FairingError::EmptySlot(_))
    ));
}

#[test]
fn auto_shape_writes_back_and_manual_overrides() {
    let (arena, base) = arena();
    let mut fairing = with_two_sides(base, BaseConfig::default());
    fairing.tick(&arena).expect("tick");
    let auto = fairing.solve_outcome().expect("solved").auto;
    assert_eq!(fairing.config().manual, auto);

    fairing.edit_config(|c| {
        c.auto_shape = false;
        c.manual = ManualShape { max_size: 1.5, cyl_start: 0.3, cyl_end: 2.0 };
    });
    let report = fairing.tick(&arena).expect("tick").expect("pass");
    assert_eq!(report.envelope.max_radius, 0.75);
    assert_eq!(report.envelope.cylinder_start, 0.3);
    assert_eq!(report.envelope.cylinder_end, 2.0);
    assert!(!report.rescanned);
}

#[test]
fn side_masses_add_up() {
    let (arena, base) = arena();
    let mut fairing = with_two_sides(base, BaseConfig::default());
    fairing.tick(&arena).expect("tick");
    let one = fairing.side_geometry(0).expect("geometry").mass;
    assert!(one > 0.0);
    assert!((fairing.total_side_mass() - 2.0 * one).abs() < 1e-12);
}

#[test]
fn failed_scan_keeps_the_request_pending() {
    let arena = PartArena::new();
    let mut fairing: FairingBase = FairingBase::new(PartId(7), BaseConfig::default());
    assert!(matches!(fairing.tick(&arena), Err(FairingError::Scan(_))));
    assert!(fairing.is_dirty());
    assert_eq!(fairing.rebuild_passes(), 0);
}
