use eframe::egui::{Vec2, vec2};

use super::quadtree::QuadNode;
use super::{Body, LayoutLink, LinkKind};

/// Deterministic separation direction for coincident points.
pub(super) fn fallback_direction(a: usize, b: usize) -> Vec2 {
    let angle = ((a as f32) * 0.618_034 + (b as f32) * 0.414_214) * std::f32::consts::TAU;
    vec2(angle.cos(), angle.sin())
}

fn repulsion_between(delta: Vec2, strength: f32, softening: f32, fallback: Vec2) -> Vec2 {
    let distance_sq = delta.length_sq();
    if distance_sq <= 1e-8 {
        return fallback * (strength / softening.max(1.0));
    }
    delta * (strength / (distance_sq + softening))
}

/// Adds the many-body push felt by `index`; far cells act as one mass.
///
/// The magnitude falls off with the inverse of the distance.
pub(super) fn accumulate_repulsion_for_node(
    node: &QuadNode,
    index: usize,
    positions: &[Vec2],
    strength: f32,
    softening: f32,
    theta: f32,
    force: &mut Vec2,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other_index in &node.indices {
            if other_index == index {
                continue;
            }
            *force += repulsion_between(
                point - positions[other_index],
                strength,
                softening,
                fallback_direction(index, other_index),
            );
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance_sq = delta.length_sq().max(0.0001);
    let distance = distance_sq.sqrt();
    let can_approximate = !node.square.contains(point)
        && ((node.square.side() / distance) < theta)
        && node.mass > 1.0;

    if can_approximate {
        *force += delta * ((strength * node.mass) / (distance_sq + softening));
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion_for_node(child, index, positions, strength, softening, theta, force);
    }
}

fn push_apart(
    from: usize,
    to: usize,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    forces: &mut [Vec2],
) {
    let delta = positions[from] - positions[to];
    let distance = delta.length();
    let min_distance = radii[from] + radii[to];
    if distance >= min_distance {
        return;
    }

    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        fallback_direction(from, to)
    };
    let overlap_push = (min_distance - distance) * strength * 0.5;
    forces[from] += direction * overlap_push;
    forces[to] -= direction * overlap_push;
}

/// Separates every overlapping pair.
///
/// Cell pairs whose gap exceeds the sum of their largest radii are skipped.
pub(super) fn accumulate_collision_pairs(
    node_a: &QuadNode,
    node_b: &QuadNode,
    same_node: bool,
    positions: &[Vec2],
    radii: &[f32],
    strength: f32,
    forces: &mut [Vec2],
) {
    if node_a.out_of_contact(node_b) {
        return;
    }

    if node_a.is_leaf() && node_b.is_leaf() {
        if same_node {
            for (offset, &from) in node_a.indices.iter().enumerate() {
                for &to in &node_a.indices[offset + 1..] {
                    push_apart(from, to, positions, radii, strength, forces);
                }
            }
        } else {
            for &from in &node_a.indices {
                for &to in &node_b.indices {
                    push_apart(from, to, positions, radii, strength, forces);
                }
            }
        }
        return;
    }

    if same_node {
        for first in 0..4 {
            let Some(child_a) = node_a.children[first].as_ref() else {
                continue;
            };

            accumulate_collision_pairs(child_a, child_a, true, positions, radii, strength, forces);

            for second in (first + 1)..4 {
                let Some(child_b) = node_a.children[second].as_ref() else {
                    continue;
                };
                accumulate_collision_pairs(
                    child_a, child_b, false, positions, radii, strength, forces,
                );
            }
        }
        return;
    }

    let split_a = if node_a.is_leaf() {
        false
    } else if node_b.is_leaf() {
        true
    } else {
        node_a.square.half >= node_b.square.half
    };

    if split_a {
        for child in node_a.children.iter().flatten() {
            accumulate_collision_pairs(child, node_b, false, positions, radii, strength, forces);
        }
    } else {
        for child in node_b.children.iter().flatten() {
            accumulate_collision_pairs(node_a, child, false, positions, radii, strength, forces);
        }
    }
}

/// Spring force toward each link's rest length.
///
/// Links touching busy nodes are weaker, and the correction is split by
/// degree so that hubs move less than leaves.
pub(super) fn accumulate_link_springs(
    bodies: &[Body],
    links: &[LayoutLink],
    degrees: &[usize],
    alpha: f32,
    forces: &mut [Vec2],
) {
    for link in links {
        let (source, target) = (link.source, link.target);
        if source == target || source >= bodies.len() || target >= bodies.len() {
            continue;
        }

        let source_body = &bodies[source];
        let target_body = &bodies[target];
        let mut delta = (target_body.position + target_body.velocity)
            - (source_body.position + source_body.velocity);
        if delta.length_sq() <= 1e-8 {
            delta = fallback_direction(source, target) * 1e-3;
        }
        let distance = delta.length();

        let source_degree = degrees[source].max(1) as f32;
        let target_degree = degrees[target].max(1) as f32;
        let strength = match link.kind {
            // Members stay tight around their cluster node whatever its size.
            LinkKind::Membership => 1.0,
            LinkKind::Base | LinkKind::InterCluster => 1.0 / source_degree.min(target_degree),
        };
        let bias = source_degree / (source_degree + target_degree);

        let correction = delta * ((distance - link.rest_length) / distance * alpha * strength);
        forces[target] -= correction * bias;
        forces[source] += correction * (1.0 - bias);
    }
}
