//! Regression tree used as the weak learner of the boosting model.
//!
//! Splits maximise the L2-regularised squared-loss gain
//! `G_L²/(n_L+λ) + G_R²/(n_R+λ) - G²/(n+λ)` where `G` is a residual sum.
//! Leaves predict `G/(n+λ)`. Candidate thresholds come from one sort per
//! feature per node followed by a prefix-sum sweep.

use rayon::prelude::*;
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub reg_lambda: f64,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Fitted regression tree over column-major features.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    root: TreeNode,
}

impl RegressionTree {
    /// Grow a tree on `rows` of `columns`, considering only `features`.
    ///
    /// `columns[j][i]` is feature `j` of row `i`; `target` is indexed by row.
    pub fn fit(
        columns: &[Vec<f64>],
        target: &[f64],
        rows: &[usize],
        features: &[usize],
        params: TreeParams,
    ) -> Self {
        let min_leaf = params.min_samples_leaf.max(1);
        let params = TreeParams {
            min_samples_leaf: min_leaf,
            ..params
        };
        Self {
            root: build_node(columns, target, rows.to_vec(), features, params, 0),
        }
    }

    /// Predict one row, reading feature `j` through `feature`.
    pub fn predict_with(&self, feature: impl Fn(usize) -> f64) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if feature(*feature_idx) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn predict_row(&self, columns: &[Vec<f64>], row: usize) -> f64 {
        self.predict_with(|j| columns[j][row])
    }

    pub fn depth(&self) -> usize {
        node_depth(&self.root)
    }

    pub fn n_leaves(&self) -> usize {
        count_leaves(&self.root)
    }
}

fn leaf_value(sum: f64, count: usize, reg_lambda: f64) -> f64 {
    let denom = count as f64 + reg_lambda;
    if denom > 0.0 {
        sum / denom
    } else {
        0.0
    }
}

fn score(sum: f64, count: usize, reg_lambda: f64) -> f64 {
    let denom = count as f64 + reg_lambda;
    if denom > 0.0 {
        sum * sum / denom
    } else {
        0.0
    }
}

fn build_node(
    columns: &[Vec<f64>],
    target: &[f64],
    rows: Vec<usize>,
    features: &[usize],
    params: TreeParams,
    depth: usize,
) -> TreeNode {
    let sum: f64 = rows.iter().map(|&i| target[i]).sum();
    let leaf = TreeNode::Leaf {
        value: leaf_value(sum, rows.len(), params.reg_lambda),
        n_samples: rows.len(),
    };

    if depth >= params.max_depth || rows.len() < 2 * params.min_samples_leaf {
        return leaf;
    }

    let Some(best) = find_best_split(columns, target, &rows, features, sum, params) else {
        return leaf;
    };

    let column = &columns[best.feature_idx];
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&i| column[i] <= best.threshold);

    TreeNode::Split {
        feature_idx: best.feature_idx,
        threshold: best.threshold,
        left: Box::new(build_node(
            columns,
            target,
            left_rows,
            features,
            params,
            depth + 1,
        )),
        right: Box::new(build_node(
            columns,
            target,
            right_rows,
            features,
            params,
            depth + 1,
        )),
    }
}

fn find_best_split(
    columns: &[Vec<f64>],
    target: &[f64],
    rows: &[usize],
    features: &[usize],
    total_sum: f64,
    params: TreeParams,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let parent_score = score(total_sum, n, params.reg_lambda);

    let candidates: Vec<Option<SplitCandidate>> = features
        .par_iter()
        .map(|&feature_idx| {
            let column = &columns[feature_idx];
            let mut sorted: Vec<(f64, f64)> =
                rows.iter().map(|&i| (column[i], target[i])).collect();
            sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let mut best: Option<SplitCandidate> = None;
            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += sorted[k].1;
                let left_count = k + 1;
                let right_count = n - left_count;
                if sorted[k].0 == sorted[k + 1].0 {
                    continue;
                }
                if left_count < params.min_samples_leaf || right_count < params.min_samples_leaf {
                    continue;
                }
                let gain = score(left_sum, left_count, params.reg_lambda)
                    + score(total_sum - left_sum, right_count, params.reg_lambda)
                    - parent_score;
                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: (sorted[k].0 + sorted[k + 1].0) / 2.0,
                        gain,
                    });
                }
            }
            best
        })
        .collect();

    // First feature wins ties so the result does not depend on thread timing.
    candidates
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<SplitCandidate>, c| match acc {
            Some(a) if a.gain >= c.gain => Some(a),
            _ => Some(c),
        })
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 0,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_leaf: 1,
            reg_lambda: 0.0,
        }
    }

    #[test]
    fn test_step_function_is_learned() {
        let x = vec![(0..10).map(|i| i as f64).collect::<Vec<_>>()];
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 1.0 } else { 3.0 }).collect();
        let rows: Vec<usize> = (0..10).collect();
        let tree = RegressionTree::fit(&x, &y, &rows, &[0], params(3));

        assert_eq!(tree.depth(), 1);
        assert_relative_eq!(tree.predict_row(&x, 2), 1.0);
        assert_relative_eq!(tree.predict_row(&x, 8), 3.0);
        assert_relative_eq!(tree.predict_with(|_| 4.5), 1.0);
    }

    #[test]
    fn test_depth_limit() {
        let x = vec![(0..32).map(|i| i as f64).collect::<Vec<_>>()];
        let y: Vec<f64> = (0..32).map(|i| (i * i) as f64).collect();
        let rows: Vec<usize> = (0..32).collect();
        let tree = RegressionTree::fit(&x, &y, &rows, &[0], params(2));
        assert!(tree.depth() <= 2);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn test_regularisation_shrinks_leaves() {
        let x = vec![vec![0.0, 1.0]];
        let y = vec![2.0, 2.0];
        let tree = RegressionTree::fit(
            &x,
            &y,
            &[0, 1],
            &[0],
            TreeParams {
                max_depth: 3,
                min_samples_leaf: 1,
                reg_lambda: 2.0,
            },
        );
        // No gain from splitting identical targets: one leaf with 4 / (2 + 2).
        assert_eq!(tree.n_leaves(), 1);
        assert_relative_eq!(tree.predict_row(&x, 0), 1.0);
    }

    #[test]
    fn test_only_listed_features_are_used() {
        let x = vec![
            (0..8).map(|i| i as f64).collect::<Vec<_>>(),
            vec![0.0; 8],
        ];
        let y: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let rows: Vec<usize> = (0..8).collect();
        let tree = RegressionTree::fit(&x, &y, &rows, &[1], params(4));
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let x = vec![(0..6).map(|i| i as f64).collect::<Vec<_>>()];
        let y = vec![0.0, 0.0, 0.0, 0.0, 0.0, 10.0];
        let rows: Vec<usize> = (0..6).collect();
        let tree = RegressionTree::fit(
            &x,
            &y,
            &rows,
            &[0],
            TreeParams {
                max_depth: 4,
                min_samples_leaf: 3,
                reg_lambda: 0.0,
            },
        );
        // Only the 3/3 split is allowed.
        assert_eq!(tree.n_leaves(), 2);
        assert_relative_eq!(tree.predict_row(&x, 5), 10.0 / 3.0);
    }
}
