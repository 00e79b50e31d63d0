//! CART decision tree with Gini impurity.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ForestError, ForestResult};

/// A node in the flattened tree. Children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Samples with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution of the training samples that reached this leaf.
    Leaf { distribution: Vec<f64> },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features examined per split before settling for the best found.
    pub max_features: usize,
}

/// A fitted binary-split classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

impl DecisionTree {
    /// Fit on the rows of `x` selected by `sample` (indices may repeat).
    pub fn fit<R: Rng>(
        x: &[Vec<f64>],
        y: &[usize],
        sample: &[usize],
        n_classes: usize,
        params: TreeParams,
        rng: &mut R,
    ) -> ForestResult<Self> {
        if sample.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        let n_features = x[sample[0]].len();

        let mut builder = Builder {
            x,
            y,
            n_classes,
            params,
            nodes: Vec::new(),
        };
        builder.grow(sample.to_vec(), 0, rng);

        Ok(Self {
            nodes: builder.nodes,
            n_features,
            n_classes,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf (a lone leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match &nodes[i] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Class distribution of the leaf `features` falls into.
    pub fn predict_proba(&self, features: &[f64]) -> ForestResult<&[f64]> {
        if features.len() != self.n_features {
            return Err(ForestError::FeatureCount {
                expected: self.n_features,
                got: features.len(),
            });
        }

        let mut i = 0;
        loop {
            match self.nodes.get(i) {
                Some(Node::Leaf { distribution }) => return Ok(distribution),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature)
                        .ok_or_else(|| ForestError::Corrupt(format!("feature {} out of range", feature)))?;
                    i = if *value <= *threshold { *left } else { *right };
                }
                None => return Err(ForestError::Corrupt(format!("node {} missing", i))),
            }
        }
    }

    /// Check structure loaded from disk: children after parents, indices in range.
    pub fn validate(&self) -> ForestResult<()> {
        if self.nodes.is_empty() {
            return Err(ForestError::Corrupt("tree has no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= self.n_features || !threshold.is_finite() {
                        return Err(ForestError::Corrupt(format!("bad split at node {}", i)));
                    }
                    if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(ForestError::Corrupt(format!("bad children at node {}", i)));
                    }
                }
                Node::Leaf { distribution } => {
                    if distribution.len() != self.n_classes {
                        return Err(ForestError::Corrupt(format!("bad leaf at node {}", i)));
                    }
                }
            }
        }
        Ok(())
    }
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    params: TreeParams,
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl<'a> Builder<'a> {
    /// Grow the subtree for `indices` and return its root's node index.
    fn grow<R: Rng>(&mut self, indices: Vec<usize>, depth: usize, rng: &mut R) -> usize {
        let counts = self.class_counts(&indices);
        let node_index = self.nodes.len();

        let is_pure = counts.iter().filter(|c| **c > 0).count() <= 1;
        let stop = is_pure
            || depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split;

        let split = if stop {
            None
        } else {
            self.best_split(&indices, &counts, rng)
        };

        let Some(split) = split else {
            self.nodes.push(leaf(&counts));
            return node_index;
        };

        // Reserve the slot so children land after the parent.
        self.nodes.push(leaf(&counts));
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);
        self.nodes[node_index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_index
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1;
        }
        counts
    }

    fn best_split<R: Rng>(&self, indices: &[usize], counts: &[usize], rng: &mut R) -> Option<Split> {
        let n_features = self.x[indices[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(rng);

        let n = indices.len();
        let mut best: Option<Split> = None;
        let mut sorted = indices.to_vec();

        for (visited, &feature) in features.iter().enumerate() {
            // Keep looking past the quota only while every feature so far was constant.
            if visited >= self.params.max_features && best.is_some() {
                break;
            }

            sorted.sort_by(|a, b| self.x[*a][feature].total_cmp(&self.x[*b][feature]));
            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();

            for pos in 0..n - 1 {
                let class = self.y[sorted[pos]];
                left[class] += 1;
                right[class] -= 1;

                let value = self.x[sorted[pos]][feature];
                let next = self.x[sorted[pos + 1]][feature];
                if next <= value {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = value / 2.0 + next / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn leaf(counts: &[usize]) -> Node {
    let total: usize = counts.iter().sum();
    let distribution = counts
        .iter()
        .map(|&c| if total == 0 { 0.0 } else { c as f64 / total as f64 })
        .collect();
    Node::Leaf { distribution }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            min_samples_split: 2,
            max_features: 2,
        }
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5, 0], 5), 0.0);
        assert_eq!(gini(&[2, 2], 4), 0.5);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn test_learns_threshold() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<usize> = (0..10).map(|i| usize::from(i >= 6)).collect();
        let sample: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let tree = DecisionTree::fit(&x, &y, &sample, 2, params(5), &mut rng).unwrap();
        tree.validate().unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_proba(&[2.0, 0.0]).unwrap(), [1.0, 0.0]);
        assert_eq!(tree.predict_proba(&[5.6, 0.0]).unwrap(), [0.0, 1.0]);
        // Midpoint between 5 and 6.
        assert_eq!(tree.predict_proba(&[5.5, 0.0]).unwrap(), [1.0, 0.0]);
    }

    #[test]
    fn test_depth_limit_and_pure_node() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let sample: Vec<usize> = (0..8).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let stump = DecisionTree::fit(&x, &y, &sample, 2, TreeParams { max_features: 1, ..params(1) }, &mut rng).unwrap();
        assert!(stump.depth() <= 1);

        let pure = DecisionTree::fit(&x, &[1; 8], &sample, 2, params(10), &mut rng).unwrap();
        assert_eq!(pure.node_count(), 1);
        assert_eq!(pure.predict_proba(&[3.0]).unwrap(), [0.0, 1.0]);
    }

    #[test]
    fn test_constant_features_become_leaf() {
        let x = vec![vec![1.0, 1.0]; 4];
        let y = vec![0, 1, 0, 1];
        let sample: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let tree = DecisionTree::fit(&x, &y, &sample, 2, params(5), &mut rng).unwrap();
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[1.0, 1.0]).unwrap(), [0.5, 0.5]);
    }

    #[test]
    fn test_feature_count_checked() {
        let x = vec![vec![0.0], vec![1.0]];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tree = DecisionTree::fit(&x, &[0, 1], &[0, 1], 2, params(3), &mut rng).unwrap();
        assert!(matches!(
            tree.predict_proba(&[0.0, 1.0]),
            Err(ForestError::FeatureCount { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_validate_rejects_backward_children() {
        let tree = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 0,
                    right: 1,
                },
                Node::Leaf {
                    distribution: vec![1.0, 0.0],
                },
            ],
            n_features: 1,
            n_classes: 2,
        };
        assert!(matches!(tree.validate(), Err(ForestError::Corrupt(_))));
    }
}
