use ar_sketch::geometry::{RibbonOrientation, build_ribbon};
use ar_sketch::scene::Scene;
use ar_sketch::stroke::{StrokeAccumulator, StrokeColor, StrokeError};
use glam::Vec3;
use proptest::prelude::*;

fn point() -> impl Strategy<Value = Vec3> {
    (-2.0f32..2.0, -2.0f32..2.0, -2.0f32..2.0).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn stroke_keeps_points_in_order(points in prop::collection::vec(point(), 0..64)) {
        let mut scene = Scene::new();
        let mut strokes = StrokeAccumulator::default();
        let handle = strokes.begin_stroke(&mut scene, StrokeColor::WHITE, 0.004);

        for point in &points {
            strokes.append_point(&mut scene, handle, *point).unwrap();
        }

        let stroke = strokes.stroke(handle).unwrap();
        prop_assert_eq!(stroke.points(), points.as_slice());
        prop_assert!(stroke.segment_count() <= points.len().saturating_sub(1));
    }

    #[test]
    fn ribbon_buffers_stay_consistent(points in prop::collection::vec(point(), 0..64)) {
        let mesh = build_ribbon(&points, 0.01, RibbonOrientation::default(), 1e-6);

        prop_assert_eq!(mesh.index_count(), mesh.segment_count() * 6);
        if mesh.segment_count() > 0 {
            prop_assert_eq!(mesh.vertex_count(), 2 * (mesh.segment_count() + 1));
        } else {
            prop_assert_eq!(mesh.vertex_count(), 0);
        }
        prop_assert!(mesh.indices.iter().all(|&index| (index as usize) < mesh.vertex_count()));
        prop_assert!(mesh
            .vertices
            .iter()
            .all(|vertex| vertex.position.iter().all(|c| c.is_finite())));
    }
}

#[test]
fn finalized_stroke_rejects_points() {
    let mut scene = Scene::new();
    let mut strokes = StrokeAccumulator::default();
    let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
    strokes.append_point(&mut scene, handle, Vec3::ZERO).unwrap();
    strokes.end_stroke(handle).unwrap();

    let err = strokes
        .append_point(&mut scene, handle, Vec3::X)
        .unwrap_err();

    assert_eq!(err, StrokeError::NotActive(handle));
    assert_eq!(strokes.stroke(handle).unwrap().point_count(), 1);
}

#[test]
fn duplicate_point_adds_no_segment() {
    let mut scene = Scene::new();
    let mut strokes = StrokeAccumulator::default();
    let handle = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
    for point in [Vec3::ZERO, Vec3::X, Vec3::X] {
        strokes.append_point(&mut scene, handle, point).unwrap();
    }

    let stroke = strokes.stroke(handle).unwrap();
    assert_eq!(stroke.point_count(), 3);
    assert_eq!(stroke.segment_count(), 1);
}

#[test]
fn handles_are_not_reused_after_reset() {
    let mut scene = Scene::new();
    let mut strokes = StrokeAccumulator::default();
    let before = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);
    strokes.reset_all(&mut scene);

    let after = strokes.begin_stroke(&mut scene, StrokeColor::RED, 0.004);

    assert_ne!(before, after);
    assert_eq!(
        strokes.append_point(&mut scene, before, Vec3::ZERO),
        Err(StrokeError::UnknownStroke(before))
    );
    assert_eq!(strokes.stroke(after).unwrap().point_count(), 0);
}
