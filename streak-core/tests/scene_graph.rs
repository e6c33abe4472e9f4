//! Scene Graph Integration Tests
//!
//! Exercises the public stage API end to end:
//! - Absolute transforms through nested containers
//! - Reparenting, removal and destruction
//! - Selectors, attribute validation and layer revisions
//! - Document save/load

use proptest::prelude::*;
use serde_json::{json, Value};
use streak_core::{EngineConfig, NodeId, SceneError, Shape, Stage, Vector2d};

/// Stage with one layer.
fn stage_with_layer() -> (Stage, NodeId) {
    let mut stage = Stage::new(400.0, 300.0);
    let layer = stage.create_layer();
    stage.add(stage.root(), layer).expect("add layer");
    (stage, layer)
}

fn close(a: Vector2d, b: Vector2d) -> bool {
    let tol = 1e-6 * (1.0 + a.x.abs().max(a.y.abs()));
    (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol
}

// ============================================================================
// Transforms
// ============================================================================

fn arb_local() -> impl Strategy<Value = (f64, f64, f64, f64, f64)> {
    (
        -100.0f64..100.0,
        -100.0f64..100.0,
        -180.0f64..180.0,
        0.5f64..2.0,
        0.5f64..2.0,
    )
}

proptest! {
    #[test]
    fn prop_absolute_transform_composes_locals(
        locals in prop::collection::vec(arb_local(), 1..6),
        px in -50.0f64..50.0,
        py in -50.0f64..50.0,
    ) {
        let (mut stage, layer) = stage_with_layer();
        let mut parent = layer;
        let mut chain = Vec::new();
        for (x, y, rotation, sx, sy) in &locals {
            let group = stage.create_group();
            stage.add(parent, group).expect("add group");
            let attrs = json!({"x": x, "y": y, "rotation": rotation, "scaleX": sx, "scaleY": sy});
            let Value::Object(map) = attrs else { unreachable!() };
            stage.set_attrs(group, &map).expect("attrs");
            chain.push(group);
            parent = group;
        }

        let mut expected = Vector2d::new(px, py);
        for id in chain.iter().rev() {
            let local = stage.node(*id).expect("node").local_transform();
            expected = local.point(expected);
        }
        let leaf = *chain.last().expect("leaf");
        let actual = stage.absolute_transform(leaf).point(Vector2d::new(px, py));
        prop_assert!(close(actual, expected), "{:?} vs {:?}", actual, expected);
    }

    #[test]
    fn prop_ancestor_change_reaches_cached_descendants(dx in -100.0f64..100.0) {
        let (mut stage, layer) = stage_with_layer();
        let group = stage.create_group();
        stage.add(layer, group).expect("group");
        let rect = stage.create_shape(Shape::rect(10.0, 10.0)).expect("rect");
        stage.add(group, rect).expect("rect");
        let before = stage.absolute_position(rect);
        stage.move_by(group, dx, 0.0).expect("move");
        let after = stage.absolute_position(rect);
        prop_assert!((after.x - before.x - dx).abs() < 1e-9);
    }
}

#[test]
fn test_offset_point_lands_on_position() {
    let (mut stage, layer) = stage_with_layer();
    let rect = stage.create_shape(Shape::rect(20.0, 20.0)).expect("rect");
    stage.add(layer, rect).expect("add");
    for (name, value) in [
        ("x", 50.0),
        ("y", 60.0),
        ("offsetX", 10.0),
        ("offsetY", 10.0),
        ("rotation", 45.0),
    ] {
        assert!(stage.set_attr(rect, name, json!(value)).expect("set"));
    }
    let p = stage
        .absolute_transform(rect)
        .point(Vector2d::new(10.0, 10.0));
    assert!(close(p, Vector2d::new(50.0, 60.0)));
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn test_reparenting_updates_both_containers() {
    let (mut stage, layer) = stage_with_layer();
    let a = stage.create_group();
    let b = stage.create_group();
    stage.add(layer, a).expect("a");
    stage.add(layer, b).expect("b");
    stage.set_position(b, 100.0, 0.0).expect("position");
    let rect = stage.create_shape(Shape::rect(5.0, 5.0)).expect("rect");
    stage.add(a, rect).expect("into a");
    assert_eq!(stage.absolute_position(rect).x, 0.0);

    stage.move_to(rect, b).expect("into b");
    assert_eq!(stage.parent(rect), Some(b));
    assert!(stage.children(a).is_empty());
    assert_eq!(stage.children(b), &[rect]);
    assert_eq!(stage.absolute_position(rect).x, 100.0);
}

#[test]
fn test_hierarchy_rules() {
    let (mut stage, layer) = stage_with_layer();
    let group = stage.create_group();
    stage.add(layer, group).expect("group");
    let inner = stage.create_group();
    stage.add(group, inner).expect("inner");
    let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");

    assert!(matches!(
        stage.add(stage.root(), group),
        Err(SceneError::InvalidHierarchy(_))
    ));
    assert!(matches!(
        stage.add(inner, group),
        Err(SceneError::InvalidHierarchy(_))
    ));
    assert!(matches!(
        stage.add(group, layer),
        Err(SceneError::InvalidHierarchy(_))
    ));
    assert_eq!(stage.parent(group), Some(layer));
    stage.add(inner, rect).expect("shape into group");
    assert_eq!(stage.layer_of(rect), Some(layer));
    assert_eq!(stage.depth(rect), Some(4));
}

#[test]
fn test_destroy_releases_keys_once() {
    let (mut stage, layer) = stage_with_layer();
    let group = stage.create_group();
    stage.add(layer, group).expect("group");
    let circle = stage.create_shape(Shape::circle(3.0)).expect("circle");
    stage.add(group, circle).expect("circle");
    let key = stage
        .node(circle)
        .and_then(|n| n.shape())
        .and_then(Shape::color_key)
        .expect("key");
    assert_eq!(stage.shape_by_key(key), Some(circle));

    let destroyed = stage.destroy(group);
    assert_eq!(destroyed, vec![group, circle]);
    assert!(!stage.contains(circle));
    assert_eq!(stage.shape_by_key(key), None);
    assert!(stage.destroy(group).is_empty());
    assert!(stage.children(layer).is_empty());
}

#[test]
fn test_remove_keeps_node_alive() {
    let (mut stage, layer) = stage_with_layer();
    let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
    stage.add(layer, rect).expect("add");
    stage.remove(rect).expect("remove");
    assert!(stage.contains(rect));
    assert_eq!(stage.parent(rect), None);
    stage.add(layer, rect).expect("re-add");
    assert_eq!(stage.children(layer), &[rect]);
}

#[test]
fn test_z_order() {
    let (mut stage, layer) = stage_with_layer();
    let ids: Vec<NodeId> = (0..3)
        .map(|_| {
            let id = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
            stage.add(layer, id).expect("add");
            id
        })
        .collect();
    assert!(stage.move_to_top(ids[0]).expect("top"));
    assert_eq!(stage.children(layer), &[ids[1], ids[2], ids[0]]);
    assert!(!stage.move_up(ids[0]).expect("up"));
    assert!(stage.move_to_bottom(ids[0]).expect("bottom"));
    assert_eq!(stage.z_index(ids[0]), Some(0));
}

// ============================================================================
// Attributes, selectors and revisions
// ============================================================================

#[test]
fn test_selectors() {
    let (mut stage, layer) = stage_with_layer();
    let group = stage.create_group();
    stage.add(layer, group).expect("group");
    let a = stage.create_shape(Shape::circle(1.0)).expect("a");
    let b = stage.create_shape(Shape::rect(1.0, 1.0)).expect("b");
    stage.add(group, a).expect("a");
    stage.add(layer, b).expect("b");
    stage.set_attr(a, "name", json!("dot red")).expect("name");
    stage.set_attr(b, "id", json!("box")).expect("id");

    let root = stage.root();
    assert_eq!(stage.find(root, ".red"), vec![a]);
    assert_eq!(stage.find(root, "#box"), vec![b]);
    assert_eq!(stage.find(root, "Shape"), vec![a, b]);
    assert_eq!(stage.find(root, "Circle, #box"), vec![a, b]);
    assert!(stage.find(root, "#").is_empty());
    assert_eq!(stage.find_ancestor(a, "Layer", false), Some(layer));
    assert_eq!(stage.find_ancestor(a, "Circle", true), Some(a));
}

#[test]
fn test_invalid_values_are_rejected_and_keep_the_old_value() {
    let mut stage = Stage::with_config(10.0, 10.0, EngineConfig::default().with_warnings(false));
    let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
    assert!(stage.set_attr(rect, "x", json!(5)).expect("x"));
    assert!(!stage.set_attr(rect, "x", json!("far")).expect("x"));
    assert_eq!(stage.get_attr(rect, "x"), json!(5.0));
    assert!(stage.set_attr(rect, "x", Value::Null).expect("reset"));
    assert_eq!(stage.get_attr(rect, "x"), json!(0.0));
}

#[test]
fn test_paint_changes_bump_layer_revision() {
    let (mut stage, layer) = stage_with_layer();
    let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
    stage.add(layer, rect).expect("add");
    let before = stage.layer_revision(layer);
    stage.set_attr(rect, "fill", json!("green")).expect("fill");
    assert!(stage.layer_revision(layer) > before);
}

#[test]
fn test_visibility_inherits_until_explicit() {
    let (mut stage, layer) = stage_with_layer();
    let group = stage.create_group();
    stage.add(layer, group).expect("group");
    let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
    stage.add(group, rect).expect("rect");
    assert!(stage.is_visible(rect));
    stage.hide(group).expect("hide");
    assert!(!stage.is_visible(rect));
    stage.show(rect).expect("show");
    assert!(stage.is_visible(rect));
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_every_shape_class_survives_a_round_trip() {
    let (mut stage, layer) = stage_with_layer();
    let shapes = [
        Shape::rect(10.0, 20.0).with_fill("red"),
        Shape::circle(4.0).with_stroke("black", 3.0),
        Shape::ellipse(4.0, 2.0),
        Shape::ring(2.0, 4.0),
        Shape::arc(2.0, 4.0, 90.0),
        Shape::sector(5.0, 45.0),
        Shape::line(vec![0.0, 0.0, 10.0, 10.0, 20.0, 0.0]),
        Shape::regular_polygon(6, 8.0),
        Shape::star(5, 3.0, 6.0),
    ];
    for shape in shapes {
        let id = stage.create_shape(shape).expect("shape");
        stage.add(layer, id).expect("add");
    }
    let first = stage.to_json().expect("save");
    let reloaded = Stage::from_json(&first).expect("load");
    assert_eq!(reloaded.len(), stage.len());
    assert_eq!(reloaded.to_json().expect("resave"), first);
}

#[test]
fn test_extension_attributes_are_kept() {
    let (mut stage, layer) = stage_with_layer();
    let rect = stage.create_shape(Shape::rect(1.0, 1.0)).expect("rect");
    stage.add(layer, rect).expect("add");
    stage
        .set_attr(rect, "customTag", json!({"owner": "ui"}))
        .expect("extra");
    let reloaded = Stage::from_json(&stage.to_json().expect("save")).expect("load");
    let copy = reloaded.find_one(reloaded.root(), "Rect").expect("rect");
    assert_eq!(reloaded.get_attr(copy, "customTag"), json!({"owner": "ui"}));
}
