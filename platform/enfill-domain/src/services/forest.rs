use crate::services::features::{FeatureRow, FEATURE_COUNT};
use crate::services::imputation::GapRegressor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: 12,
            min_samples_leaf: 2,
        }
    }
}

/// Bagged ensemble of variance-reduction regression trees. Each tree is
/// fitted on a bootstrap sample drawn from a per-tree rng seeded from the
/// base seed, so a run is reproducible bit-for-bit. Trees are independent
/// and fitted in parallel.
#[derive(Debug, Clone, Default)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
        }
    }
}

impl GapRegressor for RandomForest {
    fn fit(&mut self, x: &[FeatureRow], y: &[f64]) -> Result<(), String> {
        if x.len() != y.len() {
            return Err(format!(
                "feature/target length mismatch: {} vs {}",
                x.len(),
                y.len()
            ));
        }
        if x.len() < 2 {
            return Err(format!(
                "need at least 2 training samples, got {}",
                x.len()
            ));
        }
        if self.params.n_trees == 0 {
            return Err("n_trees must be > 0".to_string());
        }

        let params = self.params;
        self.trees = (0..params.n_trees)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(
                    params
                        .seed
                        .wrapping_add(tree_index as u64)
                        .wrapping_mul(0x9E37_79B9_7F4A_7C15),
                );
                let sample: Vec<usize> = (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
                RegressionTree::fit(x, y, &sample, &params)
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &[FeatureRow]) -> Result<Vec<f64>, String> {
        if self.trees.is_empty() {
            return Err("forest has not been fitted".to_string());
        }
        Ok(x.iter()
            .map(|row| {
                let sum: f64 = self.trees.iter().map(|tree| tree.predict_one(row)).sum();
                sum / self.trees.len() as f64
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    fn fit(x: &[FeatureRow], y: &[f64], sample: &[usize], params: &ForestParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        let mut indices = sample.to_vec();
        tree.grow(x, y, &mut indices, 0, params);
        tree
    }

    /// Builds a node over `indices` and returns its position in the arena.
    fn grow(
        &mut self,
        x: &[FeatureRow],
        y: &[f64],
        indices: &mut [usize],
        depth: usize,
        params: &ForestParams,
    ) -> usize {
        let n = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

        if depth >= params.max_depth || n < 2 * params.min_samples_leaf {
            return self.push(Node::Leaf(mean));
        }
        let Some((feature, threshold)) = best_split(x, y, indices, params.min_samples_leaf) else {
            return self.push(Node::Leaf(mean));
        };

        let split_at = partition(x, indices, feature, threshold);
        if split_at == 0 || split_at == n {
            return self.push(Node::Leaf(mean));
        }

        let node = self.push(Node::Leaf(mean));
        let (left_indices, right_indices) = indices.split_at_mut(split_at);
        let left = self.grow(x, y, left_indices, depth + 1, params);
        let right = self.grow(x, y, right_indices, depth + 1, params);
        self.nodes[node] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn predict_one(&self, row: &FeatureRow) -> f64 {
        let mut at = 0usize;
        loop {
            match self.nodes[at] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Finds the split minimizing the summed squared error of the two children.
/// Candidate thresholds are midpoints between distinct adjacent values of a
/// feature, scanned with prefix sums over the sorted order.
fn best_split(
    x: &[FeatureRow],
    y: &[f64],
    indices: &[usize],
    min_samples_leaf: usize,
) -> Option<(usize, f64)> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    let total_sse = total_sq - total_sum * total_sum / n as f64;
    if total_sse <= f64::EPSILON {
        return None;
    }

    let mut best: Option<(usize, f64, f64)> = None;
    let mut sorted = indices.to_vec();
    for feature in 0..FEATURE_COUNT {
        sorted.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (count, window) in sorted.windows(2).enumerate() {
            let value = y[window[0]];
            left_sum += value;
            left_sq += value * value;

            let left_n = count + 1;
            let right_n = n - left_n;
            if left_n < min_samples_leaf || right_n < min_samples_leaf {
                continue;
            }
            let (lo, hi) = (x[window[0]][feature], x[window[1]][feature]);
            if lo == hi {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);
            if best.map_or(true, |(_, _, best_sse)| sse < best_sse) {
                best = Some((feature, (lo + hi) / 2.0, sse));
            }
        }
    }
    best.map(|(feature, threshold, _)| (feature, threshold))
}

/// Partitions `indices` in place around the threshold; returns the size of
/// the left side (`<= threshold`).
fn partition(x: &[FeatureRow], indices: &mut [usize], feature: usize, threshold: f64) -> usize {
    let mut split_at = 0;
    for i in 0..indices.len() {
        if x[indices[i]][feature] <= threshold {
            indices.swap(split_at, i);
            split_at += 1;
        }
    }
    split_at
}
