use crate::arena::{NodeArena, NodeId};
use crate::errors::SimError;
use crate::quadtree::{build_tree, Bounds, NO_PARTICLE};
use crate::samples;

fn build_disk(n: usize, seed: u64) -> (NodeArena, NodeId, Vec<f64>, Vec<f64>, Vec<f64>) {
    let disk = samples::uniform_disk(n, 1.0, seed);
    let mut arena = NodeArena::with_capacity(10 * n);
    let region = Bounds::enclosing(&disk.pos_x, &disk.pos_y);
    let root = build_tree(&mut arena, &disk.pos_x, &disk.pos_y, &disk.mass, region).unwrap();
    (arena, root, disk.pos_x, disk.pos_y, disk.mass)
}

/// Depth-first walk pairing each node with its (parent, slot); the root has
/// no parent entry.
fn walk(arena: &NodeArena, root: NodeId) -> Vec<(NodeId, Option<(NodeId, usize)>)> {
    let mut out = vec![(root, None)];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let node = arena.node(id);
        for (q, &child) in node.children.iter().enumerate() {
            if !child.is_nil() {
                out.push((child, Some((id, q))));
                stack.push(child);
            }
        }
    }
    out
}

#[test]
fn test_enclosing_bounds_contain_all_points_with_margin() {
    let disk = samples::uniform_disk(500, 2.0, 3);
    let region = Bounds::enclosing(&disk.pos_x, &disk.pos_y);
    for (&x, &y) in disk.pos_x.iter().zip(&disk.pos_y) {
        assert!(region.contains(x, y));
        // Margin keeps every particle strictly inside.
        assert!(x > region.x_min && x < region.x_max);
        assert!(y > region.y_min && y < region.y_max);
    }
}

#[test]
fn test_enclosing_bounds_degenerate_point() {
    let region = Bounds::enclosing(&[1.0], &[2.0]);
    assert!(region.side() > 0.0);
    assert!(region.contains(1.0, 2.0));
}

#[test]
fn test_quadrant_encoding() {
    let b = Bounds {
        x_min: -1.0,
        x_max: 1.0,
        y_min: -1.0,
        y_max: 1.0,
    };
    assert_eq!(b.quadrant(-0.5, -0.5), 0);
    assert_eq!(b.quadrant(0.5, -0.5), 1);
    assert_eq!(b.quadrant(-0.5, 0.5), 2);
    assert_eq!(b.quadrant(0.5, 0.5), 3);
    // Ties use strict >, so midline points fail the test and stay low.
    assert_eq!(b.quadrant(0.0, 0.0), 0);
    assert_eq!(b.quadrant(0.0, 0.5), 2);
    assert_eq!(b.quadrant(0.5, 0.0), 1);
}

#[test]
fn test_child_bounds_match_quadrant_classification() {
    let b = Bounds {
        x_min: -2.0,
        x_max: 2.0,
        y_min: -1.0,
        y_max: 3.0,
    };
    for q in 0..4 {
        let child = b.child(q);
        // A point strictly inside the child region classifies back to q.
        let px = 0.5 * (child.x_min + child.x_max) + 1e-6;
        let py = 0.5 * (child.y_min + child.y_max) + 1e-6;
        assert_eq!(b.quadrant(px, py), q);
    }
}

#[test]
fn test_tree_child_bounds_are_consistent() {
    let (arena, root, _, _, _) = build_disk(800, 11);
    for (id, parent) in walk(&arena, root) {
        if let Some((pid, q)) = parent {
            let parent_bounds = arena.node(pid).bounds;
            assert_eq!(arena.node(id).bounds, parent_bounds.child(q));
        }
        let node = arena.node(id);
        if node.is_leaf() {
            if let Some((pid, q)) = parent {
                let parent_bounds = arena.node(pid).bounds;
                assert_eq!(parent_bounds.quadrant(node.cm_x, node.cm_y), q);
            }
        }
    }
}

#[test]
fn test_root_mass_equals_total_mass() {
    let (arena, root, _, _, mass) = build_disk(2000, 5);
    let total: f64 = mass.iter().sum();
    let max_mass = mass.iter().cloned().fold(0.0f64, f64::max);
    let tolerance = 1e-10 * mass.len() as f64 * max_mass;
    assert!(
        (arena.node(root).mass - total).abs() < tolerance,
        "root mass {} vs input total {}",
        arena.node(root).mass,
        total
    );
}

#[test]
fn test_internal_mass_and_cm_aggregate_children() {
    let (arena, root, _, _, _) = build_disk(500, 9);
    for (id, _) in walk(&arena, root) {
        let node = arena.node(id);
        if node.is_leaf() {
            continue;
        }
        assert_eq!(node.pid, NO_PARTICLE);
        let mut mass = 0.0;
        let mut mx = 0.0;
        let mut my = 0.0;
        let mut any = false;
        for &child in &node.children {
            if !child.is_nil() {
                let c = arena.node(child);
                mass += c.mass;
                mx += c.mass * c.cm_x;
                my += c.mass * c.cm_y;
                any = true;
            }
        }
        // Internal nodes always have at least one child.
        assert!(any);
        assert!((node.mass - mass).abs() < 1e-9);
        assert!((node.mass * node.cm_x - mx).abs() < 1e-9);
        assert!((node.mass * node.cm_y - my).abs() < 1e-9);
    }
}

#[test]
fn test_no_two_leaves_share_a_pid() {
    let (arena, root, _, _, _) = build_disk(1200, 21);
    let mut seen = std::collections::HashSet::new();
    for (id, _) in walk(&arena, root) {
        let node = arena.node(id);
        if node.is_leaf() {
            assert!(seen.insert(node.pid), "pid {} appears twice", node.pid);
        }
    }
}

#[test]
fn test_coincident_pair_merges_into_one_leaf() {
    let pos_x = vec![0.25, 0.25];
    let pos_y = vec![0.75, 0.75];
    let mass = vec![1.0, 3.0];
    let mut arena = NodeArena::with_capacity(16);
    let region = Bounds::enclosing(&pos_x, &pos_y);
    let root = build_tree(&mut arena, &pos_x, &pos_y, &mass, region).unwrap();

    // One node total: the root leaf absorbed the second particle.
    assert_eq!(arena.used(), 1);
    let node = arena.node(root);
    assert_eq!(node.pid, 0);
    assert_eq!(node.mass, 4.0);
    assert!((node.cm_x - 0.25).abs() < 1e-12);
    assert!((node.cm_y - 0.75).abs() < 1e-12);
}

#[test]
fn test_near_coincident_pair_merges_below_epsilon() {
    let pos_x = vec![0.0, 1e-10];
    let pos_y = vec![0.0, -1e-10];
    let mass = vec![1.0, 1.0];
    let mut arena = NodeArena::with_capacity(16);
    let region = Bounds::enclosing(&pos_x, &pos_y);
    let root = build_tree(&mut arena, &pos_x, &pos_y, &mass, region).unwrap();
    assert_eq!(arena.used(), 1);
    assert_eq!(arena.node(root).mass, 2.0);
}

#[test]
fn test_single_particle_tree_is_one_leaf() {
    let mut arena = NodeArena::with_capacity(4);
    let region = Bounds::enclosing(&[0.5], &[0.5]);
    let root = build_tree(&mut arena, &[0.5], &[0.5], &[2.0], region).unwrap();
    assert_eq!(arena.used(), 1);
    let node = arena.node(root);
    assert!(node.is_leaf());
    assert_eq!(node.pid, 0);
    assert_eq!(node.mass, 2.0);
}

#[test]
fn test_build_surfaces_arena_exhaustion() {
    let disk = samples::uniform_disk(64, 1.0, 2);
    let mut arena = NodeArena::with_capacity(8);
    let region = Bounds::enclosing(&disk.pos_x, &disk.pos_y);
    match build_tree(&mut arena, &disk.pos_x, &disk.pos_y, &disk.mass, region) {
        Err(SimError::ArenaExhausted { capacity }) => assert_eq!(capacity, 8),
        other => panic!("expected ArenaExhausted, got {:?}", other.map(|_| ())),
    }
}
