use std::f64::consts::PI;

use crate::fairing::{
    ConeShapeParams, Contour, FairingContourBuilder, FairingEnvelope, InlineTop, ShellInput, TextureMapping,
    WedgeLayout, build_colliders, build_shell,
};
use crate::geom::Tolerance;

fn free_envelope() -> FairingEnvelope {
    FairingEnvelope {
        base_radius: 0.5,
        max_radius: 0.7,
        cylinder_start: 0.2,
        cylinder_end: 1.5,
        inline: None,
    }
}

fn inline_envelope() -> FairingEnvelope {
    FairingEnvelope {
        inline: Some(InlineTop { radius: 0.4, height: 2.0 }),
        ..free_envelope()
    }
}

fn contour_for(env: &FairingEnvelope) -> Contour {
    let cone = ConeShapeParams::default();
    let mapping = TextureMapping::default();
    FairingContourBuilder::new(&cone, &mapping).build(env)
}

fn assert_closed(env: &FairingEnvelope, layout: WedgeLayout) {
    let contour = contour_for(env);
    let mapping = TextureMapping::default();
    let out = build_shell(&ShellInput {
        contour: &contour,
        envelope: env,
        layout,
        thickness: 0.02,
        mapping: &mapping,
    });
    out.mesh.validate().expect("valid buffers");
    let diag = out.mesh.diagnostics(Tolerance::WELD);
    assert_eq!(diag.unreferenced_vertex_count, 0, "{diag}");
    assert_eq!(diag.open_edge_count, 0, "{diag}");
    assert_eq!(diag.non_manifold_edge_count, 0, "{diag}");
    assert!(diag.is_closed());
}

#[test]
fn free_wedge_is_a_closed_shell() {
    for parts in [2, 3, 4] {
        assert_closed(&free_envelope(), WedgeLayout::new(24, parts));
    }
}

#[test]
fn inline_wedge_is_a_closed_shell() {
    for parts in [2, 3, 4] {
        assert_closed(&inline_envelope(), WedgeLayout::new(24, parts));
    }
}

#[test]
fn buffers_match_the_closed_form_counts() {
    for env in [free_envelope(), inline_envelope()] {
        let contour = contour_for(&env);
        let mapping = TextureMapping::default();
        let out = build_shell(&ShellInput {
            contour: &contour,
            envelope: &env,
            layout: WedgeLayout::new(24, 2),
            thickness: 0.02,
            mapping: &mapping,
        });
        assert_eq!(out.counts.inline, env.is_inline());
        assert_eq!(out.mesh.vertex_count(), out.counts.total_vertices());
        assert_eq!(out.mesh.triangle_count(), out.counts.total_faces());
        assert_eq!(out.mesh.normals.len(), out.mesh.vertex_count());
        assert_eq!(out.mesh.uvs.len(), out.mesh.vertex_count());
    }
}

#[test]
fn rebuilding_the_same_input_is_bit_identical() {
    let env = free_envelope();
    let contour = contour_for(&env);
    let mapping = TextureMapping::default();
    let input = ShellInput {
        contour: &contour,
        envelope: &env,
        layout: WedgeLayout::new(24, 2),
        thickness: 0.02,
        mapping: &mapping,
    };
    let a = build_shell(&input);
    let b = build_shell(&input);
    let bits = |m: &crate::geom::FairingMesh| m.positions_flat().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&a.mesh), bits(&b.mesh));
    assert_eq!(a.mesh.indices, b.mesh.indices);
}

#[test]
fn straight_wall_area_is_the_cylinder_share() {
    let env = FairingEnvelope {
        base_radius: 0.5,
        max_radius: 0.5,
        cylinder_start: 0.0,
        cylinder_end: 2.0,
        inline: Some(InlineTop { radius: 0.5, height: 2.0 }),
    };
    let contour = contour_for(&env);
    assert_eq!(contour.len(), 2);
    let mapping = TextureMapping::default();
    let out = build_shell(&ShellInput {
        contour: &contour,
        envelope: &env,
        layout: WedgeLayout::new(24, 2),
        thickness: 0.05,
        mapping: &mapping,
    });
    // Half of 2π·r·h.
    assert!((out.area - PI).abs() < 1e-12);
    assert!((out.volume - PI * 0.05).abs() < 1e-12);
}

#[test]
fn center_of_mass_sits_inside_the_wedge() {
    let env = free_envelope();
    let contour = contour_for(&env);
    let mapping = TextureMapping::default();
    let out = build_shell(&ShellInput {
        contour: &contour,
        envelope: &env,
        layout: WedgeLayout::new(24, 2),
        thickness: 0.02,
        mapping: &mapping,
    });
    let top = contour.points()[contour.len() - 1].height;
    assert!((out.center_offset.x - 0.35).abs() < 1e-9);
    assert!((out.center_offset.y - top * 0.5).abs() < 1e-12);
    assert_eq!(out.center_offset.z, 0.0);
}

#[test]
fn colliders_follow_the_contour() {
    let env = free_envelope();
    let contour = contour_for(&env);
    let mapping = TextureMapping::default();
    let input = ShellInput {
        contour: &contour,
        envelope: &env,
        layout: WedgeLayout::new(24, 2),
        thickness: 0.02,
        mapping: &mapping,
    };
    let volumes = build_colliders(&input, ConeShapeParams::default().nose_height_ratio, 0.0);
    assert!(!volumes.is_empty());
    assert_eq!(volumes.spheres.len(), 1);
    for b in &volumes.boxes {
        assert!(b.size.x > 0.0 && b.size.y > 0.0 && b.size.z > 0.0, "{}", b.name);
        assert!(b.center.y >= -1e-9);
    }
}

fn pinched_inline_envelope() -> FairingEnvelope {
    FairingEnvelope {
        cylinder_start: 1.0,
        cylinder_end: 1.0,
        ..inline_envelope()
    }
}

#[test]
fn inline_wedge_without_a_cylinder_welds_its_seam() {
    let env = pinched_inline_envelope();
    let contour = contour_for(&env);
    let mapping = TextureMapping::default();
    let out = build_shell(&ShellInput {
        contour: &contour,
        envelope: &env,
        layout: WedgeLayout::new(24, 2),
        thickness: 0.02,
        mapping: &mapping,
    });
    out.mesh.validate().expect("valid buffers");
    let diag = out.mesh.diagnostics(Tolerance::WELD);
    assert!(diag.is_closed(), "{diag}");
    assert_eq!(diag.degenerate_triangle_count, 0, "{diag}");
    assert_eq!(diag.unreferenced_vertex_count, 0, "{diag}");
    // The base cone end, both cylinder rows and the top cone start share one row.
    assert_eq!(out.counts.side_vertices, (contour.len() - 3) * 2);
    assert_eq!(out.mesh.vertex_count(), out.counts.total_vertices());

    for parts in [3, 4] {
        assert_closed(&env, WedgeLayout::new(24, parts));
    }
}

#[test]
fn zero_thickness_keeps_texture_coordinates_finite() {
    let mapping = TextureMapping::default();
    for env in [free_envelope(), inline_envelope()] {
        let contour = contour_for(&env);
        let out = build_shell(&ShellInput {
            contour: &contour,
            envelope: &env,
            layout: WedgeLayout::new(24, 3),
            thickness: 0.0,
            mapping: &mapping,
        });
        assert!(
            out.mesh.uvs.iter().flatten().all(|c| c.is_finite()),
            "non-finite uv, inline={}",
            env.is_inline()
        );
        assert!(out.mesh.positions_flat().iter().all(|c| c.is_finite()));
        assert_eq!(out.volume, 0.0);
    }
}

#[test]
fn colliders_skip_collapsed_segments_of_a_pinched_contour() {
    let env = pinched_inline_envelope();
    let contour = contour_for(&env);
    let mapping = TextureMapping::default();
    let layout = WedgeLayout::new(24, 2);
    let input = ShellInput {
        contour: &contour,
        envelope: &env,
        layout,
        thickness: 0.02,
        mapping: &mapping,
    };
    let volumes = build_colliders(&input, ConeShapeParams::default().nose_height_ratio, 5.0);

    let columns = layout.num_segs as usize + 1;
    let pts = contour.points();
    let distinct = pts
        .windows(2)
        .filter(|w| (w[1].planar() - w[0].planar()).length() > Tolerance::WELD.eps)
        .count();
    assert_eq!(volumes.boxes.len() % columns, 0);
    let rows = volumes.boxes.len() / columns;
    assert!(rows >= distinct && rows < pts.len() - 1, "{rows} rows from {distinct} segments");
    for b in &volumes.boxes {
        let extent = [b.size.x, b.size.y, b.size.z];
        assert!(extent.iter().all(|e| e.is_finite() && *e > 0.0), "{}: {extent:?}", b.name);
        assert!(b.center.x.is_finite() && b.center.y.is_finite() && b.center.z.is_finite());
    }
    assert_eq!(volumes.spheres.len(), 1);
    assert!(volumes.spheres[0].radius > 0.0);
}
