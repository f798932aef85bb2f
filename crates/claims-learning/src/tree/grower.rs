//! Exact greedy tree growth from gradients and hessians.
//!
//! Every candidate split is scored with the second-order gain
//!
//! ```text
//! gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)] - γ
//! ```
//!
//! and leaves get the Newton step `-G / (H + λ)`. With `g = -y`, `h = 1` and
//! `λ = 0` the gain is half the reduction in squared error and the leaf is the
//! mean target, which is how forest trees are grown.

use super::node::{Node, Split, Tree};
use crate::matrix::FeatureMatrix;
use rand::Rng;
use rand::seq::SliceRandom;

/// Regularization and splitting constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct GainParams {
    /// L2 regularization on leaf weights (lambda).
    pub reg_lambda: f64,
    /// Minimum gain required to keep a split (gamma).
    pub min_gain: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            reg_lambda: 1.0,
            min_gain: 0.0,
            min_child_weight: 1.0,
        }
    }
}

impl GainParams {
    #[inline]
    fn score(&self, grad: f64, hess: f64) -> f64 {
        let denom = hess + self.reg_lambda;
        if denom <= 0.0 { 0.0 } else { grad * grad / denom }
    }

    #[inline]
    pub fn compute_gain(
        &self,
        grad_left: f64,
        hess_left: f64,
        grad_right: f64,
        hess_right: f64,
        grad_parent: f64,
        hess_parent: f64,
    ) -> f64 {
        0.5 * (self.score(grad_left, hess_left) + self.score(grad_right, hess_right)
            - self.score(grad_parent, hess_parent))
            - self.min_gain
    }

    #[inline]
    pub fn is_valid_split(&self, hess_left: f64, hess_right: f64) -> bool {
        hess_left >= self.min_child_weight && hess_right >= self.min_child_weight
    }

    #[inline]
    pub fn compute_leaf_weight(&self, grad_sum: f64, hess_sum: f64) -> f64 {
        let denom = hess_sum + self.reg_lambda;
        if denom <= 0.0 { 0.0 } else { -grad_sum / denom }
    }
}

/// Tree growth settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowerParams {
    pub gain: GainParams,
    /// `None` grows until nodes are pure or too small.
    pub max_depth: Option<usize>,
    /// Nodes with fewer rows are never split.
    pub min_samples_split: usize,
    /// Features drawn per split. `None` tries every feature. More are drawn
    /// when none of the first `max_features` admits a split.
    pub max_features: Option<usize>,
}

impl Default for GrowerParams {
    fn default() -> Self {
        Self {
            gain: GainParams::default(),
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

struct NodeCandidate {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    grad_sum: f64,
    hess_sum: f64,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows one tree at a time over a feature matrix.
#[derive(Debug, Clone)]
pub struct TreeGrower {
    params: GrowerParams,
}

impl TreeGrower {
    pub fn new(params: GrowerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GrowerParams {
        &self.params
    }

    /// Grow a tree over `rows` of `x`.
    ///
    /// `grad` and `hess` are indexed by matrix row. `rows` may repeat an
    /// index (bootstrap samples); each occurrence counts once.
    pub fn grow<R: Rng + ?Sized>(
        &self,
        x: &FeatureMatrix,
        grad: &[f64],
        hess: &[f64],
        rows: Vec<usize>,
        rng: &mut R,
    ) -> Tree {
        let (grad_sum, hess_sum) = sums(&rows, grad, hess);
        let mut nodes = vec![Node::leaf(
            self.params.gain.compute_leaf_weight(grad_sum, hess_sum),
            hess_sum,
        )];
        let mut stack = vec![NodeCandidate {
            node: 0,
            rows,
            depth: 0,
            grad_sum,
            hess_sum,
        }];

        while let Some(candidate) = stack.pop() {
            if !self.should_expand(&candidate) {
                continue;
            }
            let Some(best) = self.find_split(x, grad, hess, &candidate, rng) else {
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = candidate
                .rows
                .iter()
                .partition(|&&r| x.get(r, best.feature) < best.threshold);
            let (left_grad, left_hess) = sums(&left_rows, grad, hess);
            let (right_grad, right_hess) = sums(&right_rows, grad, hess);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::leaf(
                self.params.gain.compute_leaf_weight(left_grad, left_hess),
                left_hess,
            ));
            nodes.push(Node::leaf(
                self.params.gain.compute_leaf_weight(right_grad, right_hess),
                right_hess,
            ));
            nodes[candidate.node].split = Some(Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
                gain: best.gain,
            });

            stack.push(NodeCandidate {
                node: right,
                rows: right_rows,
                depth: candidate.depth + 1,
                grad_sum: right_grad,
                hess_sum: right_hess,
            });
            stack.push(NodeCandidate {
                node: left,
                rows: left_rows,
                depth: candidate.depth + 1,
                grad_sum: left_grad,
                hess_sum: left_hess,
            });
        }

        Tree::from_nodes(nodes)
    }

    fn should_expand(&self, candidate: &NodeCandidate) -> bool {
        if let Some(max_depth) = self.params.max_depth
            && candidate.depth >= max_depth
        {
            return false;
        }
        candidate.rows.len() >= self.params.min_samples_split.max(2)
            && candidate.hess_sum >= 2.0 * self.params.gain.min_child_weight
    }

    fn find_split<R: Rng + ?Sized>(
        &self,
        x: &FeatureMatrix,
        grad: &[f64],
        hess: &[f64],
        candidate: &NodeCandidate,
        rng: &mut R,
    ) -> Option<SplitCandidate> {
        let n_features = x.n_cols();
        let mut features: Vec<usize> = (0..n_features).collect();
        let min_visits = match self.params.max_features {
            Some(k) if k < n_features => {
                features.shuffle(rng);
                k.max(1)
            }
            _ => n_features,
        };

        let gain = &self.params.gain;
        let parent_score = gain.score(candidate.grad_sum, candidate.hess_sum);
        // Rounding noise on large targets must not produce splits of pure nodes
        let min_improvement = 1e-12 * parent_score.abs().max(1.0);

        let mut best: Option<SplitCandidate> = None;
        let mut sorted = candidate.rows.clone();

        // Keep drawing features past `min_visits` until one can split
        for (visited, feature) in features.into_iter().enumerate() {
            if visited >= min_visits && best.is_some() {
                break;
            }
            sorted.sort_by(|&a, &b| x.get(a, feature).total_cmp(&x.get(b, feature)));

            let mut grad_left = 0.0;
            let mut hess_left = 0.0;
            for i in 0..sorted.len() - 1 {
                let row = sorted[i];
                grad_left += grad[row];
                hess_left += hess[row];

                let value = x.get(row, feature);
                let next = x.get(sorted[i + 1], feature);
                if value == next {
                    continue;
                }

                let grad_right = candidate.grad_sum - grad_left;
                let hess_right = candidate.hess_sum - hess_left;
                if !gain.is_valid_split(hess_left, hess_right) {
                    continue;
                }

                let split_gain = gain.compute_gain(
                    grad_left,
                    hess_left,
                    grad_right,
                    hess_right,
                    candidate.grad_sum,
                    candidate.hess_sum,
                );
                if split_gain > min_improvement
                    && best.as_ref().is_none_or(|b| split_gain > b.gain)
                {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: midpoint(value, next),
                        gain: split_gain,
                    });
                }
            }
        }

        best
    }
}

fn sums(rows: &[usize], grad: &[f64], hess: &[f64]) -> (f64, f64) {
    rows.iter()
        .fold((0.0, 0.0), |(g, h), &r| (g + grad[r], h + hess[r]))
}

/// Threshold between two adjacent distinct values that keeps `lower` on the
/// left even when the midpoint rounds up to `upper`.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid > lower { mid } else { upper }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn matrix(rows: &[Vec<f64>]) -> FeatureMatrix {
        let names = (0..rows[0].len()).map(|i| format!("f{}", i)).collect();
        FeatureMatrix::from_rows(names, rows).unwrap()
    }

    fn cart_params() -> GrowerParams {
        GrowerParams {
            gain: GainParams {
                reg_lambda: 0.0,
                min_gain: 0.0,
                min_child_weight: 1.0,
            },
            ..GrowerParams::default()
        }
    }

    fn grow_cart(x: &FeatureMatrix, y: &[f64], params: GrowerParams) -> Tree {
        let grad: Vec<f64> = y.iter().map(|v| -v).collect();
        let hess = vec![1.0; y.len()];
        let mut rng = StdRng::seed_from_u64(0);
        TreeGrower::new(params).grow(x, &grad, &hess, (0..y.len()).collect(), &mut rng)
    }

    #[test]
    fn test_gain_computation() {
        let params = GainParams::default();
        let gain = params.compute_gain(10.0, 5.0, -10.0, 5.0, 0.0, 10.0);
        assert!((gain - 100.0 / 6.0).abs() < 1e-9);
        assert_eq!(params.compute_leaf_weight(-12.0, 5.0), 2.0);
    }

    #[test]
    fn test_cart_fits_step_function() {
        let x = matrix(&[vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        let y = [5.0, 5.0, 9.0, 9.0];
        let tree = grow_cart(&x, &y, cart_params());

        assert_eq!(tree.n_leaves(), 2);
        let split = tree.node(0).split.unwrap();
        assert_eq!(split.threshold, 2.5);
        for (row, target) in x.rows().zip(y) {
            assert_eq!(tree.predict_row(row), target);
        }
        assert_eq!(tree.node(0).cover, 4.0);
    }

    #[test]
    fn test_pure_node_not_split() {
        let x = matrix(&[vec![1.0], vec![2.0], vec![3.0]]);
        let tree = grow_cart(&x, &[123456.0; 3], cart_params());
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(&[0.0]), 123456.0);
    }

    #[test]
    fn test_max_depth_respected() {
        let rows: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..16).map(|i| (i * i) as f64).collect();
        let params = GrowerParams {
            max_depth: Some(2),
            ..cart_params()
        };
        let tree = grow_cart(&matrix(&rows), &y, params);
        assert!(tree.depth() <= 2);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn test_unlimited_depth_interpolates() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| ((i * 7) % 5) as f64).collect();
        let x = matrix(&rows);
        let tree = grow_cart(&x, &y, cart_params());
        for (row, target) in x.rows().zip(&y) {
            assert_eq!(tree.predict_row(row), *target);
        }
    }

    #[test]
    fn test_regularized_leaf_weight() {
        let x = matrix(&[vec![0.0], vec![1.0]]);
        let grad = [-2.0, -2.0];
        let hess = [1.0, 1.0];
        let params = GrowerParams {
            max_depth: Some(0),
            ..GrowerParams::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let tree = TreeGrower::new(params).grow(&x, &grad, &hess, vec![0, 1], &mut rng);
        // -(-4) / (2 + 1)
        assert!((tree.predict_row(&[0.0]) - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_min_child_weight_blocks_split() {
        let x = matrix(&[vec![0.0], vec![1.0]]);
        let params = GrowerParams {
            gain: GainParams {
                reg_lambda: 0.0,
                min_gain: 0.0,
                min_child_weight: 2.0,
            },
            ..GrowerParams::default()
        };
        let tree = grow_cart(&x, &[0.0, 10.0], params);
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn test_bootstrap_duplicates_count_in_cover() {
        let x = matrix(&[vec![0.0], vec![1.0]]);
        let grad = [-1.0, -3.0];
        let hess = [1.0, 1.0];
        let mut rng = StdRng::seed_from_u64(0);
        let tree =
            TreeGrower::new(cart_params()).grow(&x, &grad, &hess, vec![0, 0, 1], &mut rng);
        assert_eq!(tree.node(0).cover, 3.0);
        assert!((tree.expected_value() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint_keeps_lower_on_left() {
        assert_eq!(midpoint(1.0, 3.0), 2.0);
        let a = 1.0_f64;
        let b = f64::from_bits(a.to_bits() + 1);
        assert!(a < midpoint(a, b));
    }
}
