//! Barnes-Hut quadtree over layout bodies.
//!
//! Each cell keeps the aggregate mass read by the many-body force and the
//! largest body radius below it, which bounds collision checks between cells.

use eframe::egui::{Vec2, vec2};

const LEAF_CAPACITY: usize = 12;
const MAX_DEPTH: usize = 10;

/// Axis-aligned square covered by one cell.
#[derive(Clone, Copy, Debug)]
pub(super) struct Square {
    pub(super) center: Vec2,
    pub(super) half: f32,
}

impl Square {
    fn enclosing(points: &[Vec2]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(min, max), point| {
                (min.min(*point), max.max(*point))
            });
        if !(min.is_finite() && max.is_finite()) {
            return None;
        }

        let span = (max - min).max_elem().max(1.0);
        Some(Self {
            center: (min + max) * 0.5,
            half: span * 0.5 + 1.0,
        })
    }

    pub(super) fn contains(self, point: Vec2) -> bool {
        let offset = (point - self.center).abs();
        offset.x <= self.half && offset.y <= self.half
    }

    /// Bit 0 marks the right half, bit 1 the lower half.
    fn quadrant_of(self, point: Vec2) -> usize {
        usize::from(point.x >= self.center.x) | (usize::from(point.y >= self.center.y) << 1)
    }

    fn quadrant(self, index: usize) -> Self {
        let half = self.half * 0.5;
        let offset = |bit: usize| if index & bit == 0 { -half } else { half };
        Self {
            center: self.center + vec2(offset(1), offset(2)),
            half,
        }
    }

    pub(super) fn side(self) -> f32 {
        self.half * 2.0
    }

    /// Shortest distance between the two squares; zero when they touch.
    pub(super) fn gap(self, other: Self) -> f32 {
        let reach = Vec2::splat(self.half + other.half);
        ((self.center - other.center).abs() - reach)
            .max(Vec2::ZERO)
            .length()
    }
}

pub(super) struct QuadNode {
    pub(super) square: Square,
    pub(super) center_of_mass: Vec2,
    pub(super) mass: f32,
    pub(super) max_radius: f32,
    /// Body indices; only leaves hold any.
    pub(super) indices: Vec<usize>,
    pub(super) children: [Option<Box<QuadNode>>; 4],
}

impl QuadNode {
    /// Builds the tree over `positions`, with `radii` indexed the same way.
    pub(super) fn build(positions: &[Vec2], radii: &[f32]) -> Option<Self> {
        let square = Square::enclosing(positions)?;
        let indices = (0..positions.len()).collect();
        Some(Self::split(square, indices, positions, radii, 0))
    }

    fn split(
        square: Square,
        indices: Vec<usize>,
        positions: &[Vec2],
        radii: &[f32],
        depth: usize,
    ) -> Self {
        let mass = indices.len() as f32;
        let sum = indices
            .iter()
            .fold(Vec2::ZERO, |sum, &index| sum + positions[index]);
        let max_radius = indices
            .iter()
            .map(|&index| radii.get(index).copied().unwrap_or(0.0))
            .fold(0.0, f32::max);

        let mut cell = Self {
            square,
            center_of_mass: if mass > 0.0 { sum / mass } else { sum },
            mass,
            max_radius,
            indices,
            children: Default::default(),
        };
        if depth >= MAX_DEPTH || cell.indices.len() <= LEAF_CAPACITY {
            return cell;
        }

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for &index in &cell.indices {
            buckets[square.quadrant_of(positions[index])].push(index);
        }
        // Coincident points would otherwise split forever.
        if buckets.iter().filter(|bucket| !bucket.is_empty()).count() <= 1 {
            return cell;
        }

        for (quadrant, bucket) in buckets.into_iter().enumerate() {
            if !bucket.is_empty() {
                cell.children[quadrant] = Some(Box::new(Self::split(
                    square.quadrant(quadrant),
                    bucket,
                    positions,
                    radii,
                    depth + 1,
                )));
            }
        }
        cell.indices.clear();
        cell
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// True when no body under `self` can touch a body under `other`.
    pub(super) fn out_of_contact(&self, other: &Self) -> bool {
        self.square.gap(other.square) >= self.max_radius + other.max_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_indices(node: &QuadNode, out: &mut Vec<usize>) {
        out.extend(&node.indices);
        for child in node.children.iter().flatten() {
            leaf_indices(child, out);
        }
    }

    fn grid(count: usize) -> Vec<Vec2> {
        (0..count)
            .map(|index| vec2((index % 10) as f32 * 13.0, (index / 10) as f32 * 7.0))
            .collect()
    }

    #[test]
    fn every_point_lands_in_exactly_one_leaf() {
        let positions = grid(100);
        let tree = QuadNode::build(&positions, &[5.0; 100]).unwrap();
        assert_eq!(tree.mass, 100.0);
        assert!(!tree.is_leaf());

        let mut indices = Vec::new();
        leaf_indices(&tree, &mut indices);
        indices.sort_unstable();
        assert_eq!(indices, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn cells_track_their_largest_radius() {
        let positions = grid(100);
        let mut radii = vec![2.0; 100];
        radii[99] = 30.0;
        let tree = QuadNode::build(&positions, &radii).unwrap();
        assert_eq!(tree.max_radius, 30.0);

        let children = tree.children.iter().flatten().collect::<Vec<_>>();
        assert!(children.iter().any(|child| child.max_radius == 30.0));
        assert!(children.iter().any(|child| child.max_radius == 2.0));
    }

    #[test]
    fn contact_check_uses_cell_radii() {
        let near = grid(20);
        let far = near
            .iter()
            .map(|point| *point + vec2(400.0, 0.0))
            .collect::<Vec<_>>();
        let far_tree = QuadNode::build(&far, &[1.0; 20]).unwrap();

        let small = QuadNode::build(&near, &[1.0; 20]).unwrap();
        assert!(small.out_of_contact(&far_tree));

        let mut radii = vec![1.0; 20];
        radii[0] = 400.0;
        let large = QuadNode::build(&near, &radii).unwrap();
        assert!(!large.out_of_contact(&far_tree));
    }

    #[test]
    fn coincident_points_stay_in_one_leaf() {
        let positions = vec![vec2(5.0, 5.0); 40];
        let tree = QuadNode::build(&positions, &[1.0; 40]).unwrap();
        assert!(tree.is_leaf());
        assert_eq!(tree.indices.len(), 40);
    }

    #[test]
    fn empty_input_builds_nothing() {
        assert!(QuadNode::build(&[], &[]).is_none());
    }
}
