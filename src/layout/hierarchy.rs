use std::collections::HashMap;

use eframe::egui::{Vec2, vec2};

use crate::config::TreeLayoutConfig;
use crate::graph::TreeNode;

/// Rank-based placement for a tree: x grows with depth, leaves take
/// consecutive rows and every parent sits midway between its first and last
/// child. The result is a pure function of the tree order, centered on the
/// origin.
pub fn tree_layout(tree: &[TreeNode], config: &TreeLayoutConfig) -> Vec<(String, Vec2)> {
    if tree.is_empty() {
        return Vec::new();
    }

    let index_by_id = tree
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect::<HashMap<_, _>>();

    let mut children = vec![Vec::new(); tree.len()];
    let mut roots = Vec::new();
    for (index, node) in tree.iter().enumerate() {
        match node
            .parent_id
            .as_deref()
            .and_then(|parent| index_by_id.get(parent))
        {
            Some(&parent) if parent != index => children[parent].push(index),
            _ => roots.push(index),
        }
    }

    let mut rows = vec![0.0_f32; tree.len()];
    let mut next_row = 0usize;
    let mut stack = Vec::new();
    for &root in &roots {
        stack.push((root, false));
        while let Some((index, expanded)) = stack.pop() {
            if children[index].is_empty() {
                rows[index] = next_row as f32;
                next_row += 1;
            } else if expanded {
                let first = children[index][0];
                let last = children[index][children[index].len() - 1];
                rows[index] = (rows[first] + rows[last]) * 0.5;
            } else {
                stack.push((index, true));
                for &child in children[index].iter().rev() {
                    stack.push((child, false));
                }
            }
        }
    }

    let max_depth = tree.iter().map(|node| node.depth).max().unwrap_or(0) as f32;
    let max_row = next_row.saturating_sub(1) as f32;
    let offset = vec2(
        max_depth * config.rank_spacing * 0.5,
        max_row * config.sibling_spacing * 0.5,
    );

    tree.iter()
        .zip(rows)
        .map(|(node, row)| {
            let position = vec2(
                node.depth as f32 * config.rank_spacing,
                row * config.sibling_spacing,
            );
            (node.id.clone(), position - offset)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, parent: Option<&str>, depth: usize) -> TreeNode {
        TreeNode {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            depth,
        }
    }

    fn config() -> TreeLayoutConfig {
        TreeLayoutConfig {
            rank_spacing: 100.0,
            sibling_spacing: 10.0,
        }
    }

    fn position(layout: &[(String, Vec2)], id: &str) -> Vec2 {
        layout
            .iter()
            .find(|(node, _)| node == id)
            .map(|(_, position)| *position)
            .unwrap()
    }

    #[test]
    fn parent_is_centered_over_children() {
        let tree = vec![
            entry("r", None, 0),
            entry("a", Some("r"), 1),
            entry("a1", Some("a"), 2),
            entry("a2", Some("a"), 2),
            entry("b", Some("r"), 1),
        ];
        let layout = tree_layout(&tree, &config());

        let a1 = position(&layout, "a1");
        let a2 = position(&layout, "a2");
        let a = position(&layout, "a");
        let b = position(&layout, "b");
        let r = position(&layout, "r");

        assert_eq!(a.y, (a1.y + a2.y) * 0.5);
        assert_eq!(r.y, (a.y + b.y) * 0.5);
        assert_eq!(a2.y - a1.y, 10.0);
        assert_eq!(b.y - a2.y, 10.0);
        assert_eq!(a.x - r.x, 100.0);
        assert_eq!(a1.x - a.x, 100.0);
    }

    #[test]
    fn siblings_never_share_a_row() {
        let tree = vec![
            entry("r", None, 0),
            entry("a", Some("r"), 1),
            entry("b", Some("r"), 1),
            entry("c", Some("r"), 1),
        ];
        let layout = tree_layout(&tree, &config());
        let mut rows = layout[1..].iter().map(|(_, p)| p.y).collect::<Vec<_>>();
        rows.dedup();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn layout_is_centered_and_repeatable() {
        let tree = vec![
            entry("r", None, 0),
            entry("a", Some("r"), 1),
            entry("b", Some("r"), 1),
        ];
        let first = tree_layout(&tree, &config());
        assert_eq!(first, tree_layout(&tree, &config()));
        assert_eq!(position(&first, "r"), vec2(-50.0, 0.0));
        assert_eq!(position(&first, "a"), vec2(50.0, -5.0));
    }

    #[test]
    fn single_node_sits_at_origin() {
        let layout = tree_layout(&[entry("solo", None, 0)], &config());
        assert_eq!(layout, vec![("solo".to_string(), Vec2::ZERO)]);
    }
}
