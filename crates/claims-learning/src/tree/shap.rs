//! Path-dependent TreeSHAP.
//!
//! Computes exact Shapley values for a single tree in `O(leaves × depth²)`,
//! using node covers to estimate conditional expectations. Features that
//! appear more than once on a path are unwound before being extended again.

use super::node::Tree;

#[derive(Debug, Clone, Copy, Default)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

/// Add the SHAP contributions of `tree` for `row` into `phi`, scaled by
/// `scale` (1 for boosted sums, `1/n_trees` for averaged forests).
///
/// `phi` must have one slot per feature.
pub fn add_tree_contributions(tree: &Tree, row: &[f64], scale: f64, phi: &mut [f64]) {
    let root = PathElement {
        feature: None,
        zero_fraction: 1.0,
        one_fraction: 1.0,
        pweight: 1.0,
    };
    recurse(tree, row, scale, phi, 0, &[], 0, root);
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    tree: &Tree,
    row: &[f64],
    scale: f64,
    phi: &mut [f64],
    node_idx: usize,
    parent_path: &[PathElement],
    depth: usize,
    incoming: PathElement,
) {
    let mut path = Vec::with_capacity(depth + 2);
    path.extend_from_slice(&parent_path[..depth]);
    path.push(PathElement::default());
    extend_path(
        &mut path,
        depth,
        incoming.zero_fraction,
        incoming.one_fraction,
        incoming.feature,
    );

    let node = tree.node(node_idx);
    let Some(split) = node.split else {
        let leaf_value = node.value * scale;
        for i in 1..=depth {
            let weight = unwound_path_sum(&path, depth, i);
            let el = path[i];
            if let Some(feature) = el.feature {
                phi[feature] += weight * (el.one_fraction - el.zero_fraction) * leaf_value;
            }
        }
        return;
    };

    let (hot, cold) = if row[split.feature] < split.threshold {
        (split.left, split.right)
    } else {
        (split.right, split.left)
    };
    let cover = node.cover;
    let (hot_zero, cold_zero) = if cover > 0.0 {
        (tree.node(hot).cover / cover, tree.node(cold).cover / cover)
    } else {
        (0.5, 0.5)
    };

    let mut depth = depth;
    let mut incoming_zero = 1.0;
    let mut incoming_one = 1.0;
    if let Some(k) = (1..=depth).find(|&k| path[k].feature == Some(split.feature)) {
        incoming_zero = path[k].zero_fraction;
        incoming_one = path[k].one_fraction;
        unwind_path(&mut path, depth, k);
        depth -= 1;
    }

    recurse(
        tree,
        row,
        scale,
        phi,
        hot,
        &path,
        depth + 1,
        PathElement {
            feature: Some(split.feature),
            zero_fraction: hot_zero * incoming_zero,
            one_fraction: incoming_one,
            pweight: 0.0,
        },
    );
    recurse(
        tree,
        row,
        scale,
        phi,
        cold,
        &path,
        depth + 1,
        PathElement {
            feature: Some(split.feature),
            zero_fraction: cold_zero * incoming_zero,
            one_fraction: 0.0,
            pweight: 0.0,
        },
    );
}

fn extend_path(
    path: &mut [PathElement],
    depth: usize,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    path[depth] = PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    };
    let d1 = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / d1;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / d1;
    }
}

fn unwind_path(path: &mut [PathElement], depth: usize, path_index: usize) {
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let d1 = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * d1 / ((i + 1) as f64 * one_fraction);
            next_one_portion = tmp - path[i].pweight * zero_fraction * (depth - i) as f64 / d1;
        } else {
            path[i].pweight = path[i].pweight * d1 / (zero_fraction * (depth - i) as f64);
        }
    }

    for i in path_index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
}

fn unwound_path_sum(path: &[PathElement], depth: usize, path_index: usize) -> f64 {
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let d1 = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * d1 / ((i + 1) as f64 * one_fraction);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero_fraction * (depth - i) as f64 / d1;
        } else if zero_fraction != 0.0 {
            total += path[i].pweight / zero_fraction / ((depth - i) as f64 / d1);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::super::node::tests::sample_tree;
    use super::super::node::{Node, Split};
    use super::*;

    /// E[f(x) | x_S] with features outside `subset` marginalized by cover.
    fn conditional_expectation(tree: &Tree, row: &[f64], subset: u32, idx: usize) -> f64 {
        let node = tree.node(idx);
        match node.split {
            None => node.value,
            Some(split) if subset & (1 << split.feature) != 0 => {
                let next = if row[split.feature] < split.threshold {
                    split.left
                } else {
                    split.right
                };
                conditional_expectation(tree, row, subset, next)
            }
            Some(split) => {
                let left = tree.node(split.left).cover;
                let right = tree.node(split.right).cover;
                (left * conditional_expectation(tree, row, subset, split.left)
                    + right * conditional_expectation(tree, row, subset, split.right))
                    / node.cover
            }
        }
    }

    fn brute_force_shap(tree: &Tree, row: &[f64], n_features: usize) -> Vec<f64> {
        let factorial = |n: usize| (1..=n).map(|v| v as f64).product::<f64>();
        let mut phi = vec![0.0; n_features];
        for (j, phi_j) in phi.iter_mut().enumerate() {
            for subset in 0u32..(1 << n_features) {
                if subset & (1 << j) != 0 {
                    continue;
                }
                let s = subset.count_ones() as usize;
                let weight =
                    factorial(s) * factorial(n_features - s - 1) / factorial(n_features);
                let with = conditional_expectation(tree, row, subset | (1 << j), 0);
                let without = conditional_expectation(tree, row, subset, 0);
                *phi_j += weight * (with - without);
            }
        }
        phi
    }

    fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Option<Split> {
        Some(Split {
            feature,
            threshold,
            left,
            right,
            gain: 1.0,
        })
    }

    /// Splits on feature 0 twice along one path.
    fn repeated_feature_tree() -> Tree {
        Tree::from_nodes(vec![
            Node {
                split: split(0, 5.0, 1, 2),
                value: 0.0,
                cover: 20.0,
            },
            Node {
                split: split(1, 0.5, 3, 4),
                value: 0.0,
                cover: 12.0,
            },
            Node::leaf(10.0, 8.0),
            Node {
                split: split(0, 2.0, 5, 6),
                value: 0.0,
                cover: 7.0,
            },
            Node {
                split: split(2, 1.0, 7, 8),
                value: 0.0,
                cover: 5.0,
            },
            Node::leaf(-3.0, 3.0),
            Node::leaf(1.0, 4.0),
            Node::leaf(4.0, 2.0),
            Node::leaf(7.0, 3.0),
        ])
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_matches_brute_force() {
        let tree = sample_tree();
        for row in [[0.0, 0.0], [0.0, 5.0], [1.0, 0.0], [1.0, 5.0]] {
            let mut phi = vec![0.0; 2];
            add_tree_contributions(&tree, &row, 1.0, &mut phi);
            assert_close(&phi, &brute_force_shap(&tree, &row, 2));
        }
    }

    #[test]
    fn test_repeated_feature_matches_brute_force() {
        let tree = repeated_feature_tree();
        let rows = [
            [0.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
            [3.0, 1.0, 2.0],
            [9.0, 1.0, 0.0],
            [1.0, 1.0, 5.0],
        ];
        for row in rows {
            let mut phi = vec![0.0; 3];
            add_tree_contributions(&tree, &row, 1.0, &mut phi);
            assert_close(&phi, &brute_force_shap(&tree, &row, 3));
        }
    }

    #[test]
    fn test_local_accuracy() {
        let tree = repeated_feature_tree();
        let row = [3.0, 1.0, 2.0];
        let mut phi = vec![0.0; 3];
        add_tree_contributions(&tree, &row, 1.0, &mut phi);
        let total: f64 = phi.iter().sum::<f64>() + tree.expected_value();
        assert!((total - tree.predict_row(&row)).abs() < 1e-9);
    }

    #[test]
    fn test_single_leaf_has_no_contributions() {
        let tree = Tree::from_nodes(vec![Node::leaf(2.5, 10.0)]);
        let mut phi = vec![0.0; 2];
        add_tree_contributions(&tree, &[1.0, 1.0], 1.0, &mut phi);
        assert_eq!(phi, vec![0.0, 0.0]);
    }

    #[test]
    fn test_scale_applies_to_contributions() {
        let tree = sample_tree();
        let mut full = vec![0.0; 2];
        let mut half = vec![0.0; 2];
        add_tree_contributions(&tree, &[0.0, 0.0], 1.0, &mut full);
        add_tree_contributions(&tree, &[0.0, 0.0], 0.5, &mut half);
        assert_close(&half, &[full[0] / 2.0, full[1] / 2.0]);
    }
}
