//! Random forest regressor used as the estimator of the iterative imputer.
//!
//! Each tree is a CART regression tree grown on a bootstrap sample of the
//! training rows, splitting on the threshold that minimises the summed
//! squared error of the two children. Predictions average the trees.

use anyhow::{Result, bail};
use rand::Rng;
use rand::rngs::StdRng;

/// Hyper-parameters shared by every tree of a forest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART regression tree stored as a flat node arena.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    position: usize,
    sse: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `sample`.
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, params: &ForestParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, y, sample, 0, params);
        tree
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        mut rows: Vec<usize>,
        depth: usize,
        params: &ForestParams,
    ) -> usize {
        let node_id = self.nodes.len();
        let n = rows.len() as f64;
        let sum: f64 = rows.iter().map(|&r| y[r]).sum();
        let sum_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();
        let value = sum / n;
        let parent_sse = sum_sq - sum * sum / n;

        self.nodes.push(Node::Leaf { value });

        let depth_exhausted = params.max_depth.is_some_and(|max| depth >= max);
        if depth_exhausted || rows.len() < 2 * params.min_samples_leaf || parent_sse <= 1e-12 {
            return node_id;
        }

        let Some(split) = Self::best_split(x, y, &mut rows, params.min_samples_leaf) else {
            return node_id;
        };
        if split.sse >= parent_sse {
            return node_id;
        }

        rows.sort_by(|&a, &b| x[a][split.feature].total_cmp(&x[b][split.feature]));
        let right_rows = rows.split_off(split.position);
        let left = self.grow(x, y, rows, depth + 1, params);
        let right = self.grow(x, y, right_rows, depth + 1, params);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Exhaustive search over every feature and every boundary between
    /// distinct sorted values.
    fn best_split(
        x: &[Vec<f64>],
        y: &[f64],
        rows: &mut [usize],
        min_samples_leaf: usize,
    ) -> Option<SplitCandidate> {
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let n = rows.len();
        let total_sum: f64 = rows.iter().map(|&r| y[r]).sum();
        let total_sq: f64 = rows.iter().map(|&r| y[r] * y[r]).sum();

        let mut best: Option<SplitCandidate> = None;

        for feature in 0..n_features {
            rows.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for position in 1..n {
                let prev = rows[position - 1];
                left_sum += y[prev];
                left_sq += y[prev] * y[prev];

                if position < min_samples_leaf || n - position < min_samples_leaf {
                    continue;
                }

                let lo = x[prev][feature];
                let hi = x[rows[position]][feature];
                if lo >= hi {
                    continue;
                }

                let n_left = position as f64;
                let n_right = (n - position) as f64;
                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if best.as_ref().is_none_or(|b| sse < b.sse) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        position,
                        sse,
                    });
                }
            }
        }

        best
    }

    /// Predict the target for one feature row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Bagged ensemble of regression trees.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params: ForestParams {
                n_estimators: params.n_estimators.max(1),
                min_samples_leaf: params.min_samples_leaf.max(1),
                ..params
            },
            trees: Vec::new(),
        }
    }

    /// Fit the forest on row-major features `x` and targets `y`.
    ///
    /// Bootstrap samples are drawn from `rng`, so the same seed yields the
    /// same forest.
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], rng: &mut StdRng) -> Result<()> {
        if x.is_empty() {
            bail!("cannot fit a forest on zero samples");
        }
        if x.len() != y.len() {
            bail!(
                "feature rows ({}) and targets ({}) differ in length",
                x.len(),
                y.len()
            );
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            bail!("feature rows have inconsistent widths");
        }
        if y.iter().any(|v| !v.is_finite()) || x.iter().flatten().any(|v| !v.is_finite()) {
            bail!("training data contains non-finite values");
        }

        let n = x.len();
        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, sample, &self.params)
            })
            .collect();

        Ok(())
    }

    /// Average prediction of all trees. Returns None before `fit`.
    pub fn predict(&self, row: &[f64]) -> Option<f64> {
        if self.trees.is_empty() {
            return None;
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict(row)).sum();
        Some(total / self.trees.len() as f64)
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| 2.0 * i as f64 + 1.0).collect();
        (x, y)
    }

    #[test]
    fn test_single_tree_fits_training_data_exactly() {
        let (x, y) = linear_data();
        let params = ForestParams::default();
        let tree = RegressionTree::fit(&x, &y, (0..x.len()).collect(), &params);

        for (row, target) in x.iter().zip(&y) {
            assert_eq!(tree.predict(row), *target);
        }
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let (x, y) = linear_data();
        let params = ForestParams {
            max_depth: Some(1),
            ..ForestParams::default()
        };
        let tree = RegressionTree::fit(&x, &y, (0..x.len()).collect(), &params);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_constant_target_yields_single_leaf() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let y = vec![4.0; 5];
        let tree = RegressionTree::fit(&x, &y, (0..5).collect(), &ForestParams::default());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 4.0);
    }

    #[test]
    fn test_forest_prediction_within_target_range() {
        let (x, y) = linear_data();
        let mut forest = RandomForestRegressor::new(ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        forest.fit(&x, &y, &mut rng).unwrap();

        assert_eq!(forest.trees().len(), 10);
        let prediction = forest.predict(&[10.0]).unwrap();
        assert!((1.0..=39.0).contains(&prediction));
        assert!((prediction - 21.0).abs() < 6.0);
    }

    #[test]
    fn test_forest_is_deterministic_for_a_seed() {
        let (x, y) = linear_data();
        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };

        let mut first = RandomForestRegressor::new(params);
        first.fit(&x, &y, &mut StdRng::seed_from_u64(7)).unwrap();
        let mut second = RandomForestRegressor::new(params);
        second.fit(&x, &y, &mut StdRng::seed_from_u64(7)).unwrap();

        for probe in [0.5, 7.2, 13.9, 18.0] {
            assert_eq!(first.predict(&[probe]), second.predict(&[probe]));
        }
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let mut forest = RandomForestRegressor::new(ForestParams::default());
        let mut rng = StdRng::seed_from_u64(0);

        assert!(forest.fit(&[], &[], &mut rng).is_err());
        assert!(forest.fit(&[vec![1.0]], &[1.0, 2.0], &mut rng).is_err());
        assert!(forest.fit(&[vec![f64::NAN]], &[1.0], &mut rng).is_err());
        assert!(forest.predict(&[1.0]).is_none());
    }
}
