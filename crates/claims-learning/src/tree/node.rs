//! Array-of-nodes binary decision tree.

use serde::{Deserialize, Serialize};

/// Split of an internal node. Rows with `x[feature] < threshold` go left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
    pub gain: f64,
}

/// One tree node.
///
/// `value` is the prediction of a leaf (and the would-be leaf value of an
/// internal node). `cover` is the hessian sum of the training rows that
/// reached the node, which for unit hessians is the row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub split: Option<Split>,
    pub value: f64,
    pub cover: f64,
}

impl Node {
    pub fn leaf(value: f64, cover: f64) -> Self {
        Self {
            split: None,
            value,
            cover,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}

/// A fitted decision tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Build a tree from nodes. Children must come after their parent.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Index of the leaf that `row` falls into.
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        while let Some(split) = self.nodes[idx].split {
            idx = if row[split.feature] < split.threshold {
                split.left
            } else {
                split.right
            };
        }
        idx
    }

    #[inline]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.nodes[self.leaf_index(row)].value
    }

    /// Longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes[idx].split {
                Some(split) => {
                    stack.push((split.left, depth + 1));
                    stack.push((split.right, depth + 1));
                }
                None => max_depth = max_depth.max(depth),
            }
        }
        max_depth
    }

    /// Cover-weighted mean of the leaf values: the tree's expected output
    /// over the training distribution.
    pub fn expected_value(&self) -> f64 {
        let root_cover = self.nodes[0].cover;
        if root_cover <= 0.0 {
            return self.nodes[0].value;
        }
        self.nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.value * n.cover)
            .sum::<f64>()
            / root_cover
    }

    /// Multiply every node value by `factor` (learning-rate shrinkage).
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            node.value *= factor;
        }
    }

    /// Total split gain per feature.
    pub fn add_gain_importance(&self, importance: &mut [f64]) {
        for split in self.nodes.iter().filter_map(|n| n.split) {
            importance[split.feature] += split.gain;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// x0 < 0.5 -> (x1 < 1.0 -> 1.0 | 2.0) | 3.0
    pub(crate) fn sample_tree() -> Tree {
        Tree::from_nodes(vec![
            Node {
                split: Some(Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                    gain: 4.0,
                }),
                value: 0.0,
                cover: 10.0,
            },
            Node {
                split: Some(Split {
                    feature: 1,
                    threshold: 1.0,
                    left: 3,
                    right: 4,
                    gain: 1.0,
                }),
                value: 0.0,
                cover: 6.0,
            },
            Node::leaf(3.0, 4.0),
            Node::leaf(1.0, 2.0),
            Node::leaf(2.0, 4.0),
        ])
    }

    #[test]
    fn test_predict_row() {
        let tree = sample_tree();
        assert_eq!(tree.predict_row(&[0.0, 0.0]), 1.0);
        assert_eq!(tree.predict_row(&[0.0, 5.0]), 2.0);
        assert_eq!(tree.predict_row(&[0.5, 0.0]), 3.0);
    }

    #[test]
    fn test_structure() {
        let tree = sample_tree();
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_expected_value_is_cover_weighted() {
        let tree = sample_tree();
        // (1*2 + 2*4 + 3*4) / 10
        assert!((tree.expected_value() - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_scale_and_importance() {
        let mut tree = sample_tree();
        tree.scale(0.5);
        assert_eq!(tree.predict_row(&[0.5, 0.0]), 1.5);

        let mut importance = vec![0.0; 2];
        tree.add_gain_importance(&mut importance);
        assert_eq!(importance, vec![4.0, 1.0]);
    }
}
