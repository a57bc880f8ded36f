//! Isolation forest anomaly scoring
//!
//! Each tree recursively partitions a random subsample of the rows with
//! random axis-aligned splits. Rows that isolate in few splits are
//! anomalous. Scores follow the convention
//! `0.5 - 2^(-E[h(x)] / c(psi))`: negative means anomalous, and the more
//! negative the more unusual.

use crate::domain::errors::ScanError;
use crate::domain::features::FeatureVector;
use ndarray::{Array2, ArrayView1, Axis};
use rand::SeedableRng;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Default subsample size per tree
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Forest size and seeding
#[derive(Debug, Clone, Copy)]
pub struct IsolationForestConfig {
    pub n_trees: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: DEFAULT_MAX_SAMPLES,
            seed: 0,
        }
    }
}

/// Average path length of an unsuccessful binary search tree lookup among
/// `n` points; normalises path lengths.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(data: &Array2<f64>, rows: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(data, rows, 0, height_limit, rng),
        }
    }

    fn build_node(
        data: &Array2<f64>,
        rows: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> IsolationNode {
        if depth >= height_limit || rows.len() <= 1 {
            return IsolationNode::Leaf { size: rows.len() };
        }

        // Only features that still vary within this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &row| {
                        let value = data[[row, feature]];
                        (min.min(value), max.max(value))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.choose(rng) else {
            return IsolationNode::Leaf { size: rows.len() };
        };
        let split = rng.random_range(min..max);

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| data[[row, feature]] < split);

        IsolationNode::Internal {
            feature,
            split,
            left: Box::new(Self::build_node(data, left_rows, depth + 1, height_limit, rng)),
            right: Box::new(Self::build_node(data, right_rows, depth + 1, height_limit, rng)),
        }
    }

    fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *split { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// Ensemble of isolation trees fitted on one run's feature matrix
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fits the forest. Trees are built in parallel, tree `i` seeded with
    /// `seed + i`, so results are reproducible for a fixed seed.
    pub fn fit(data: &Array2<f64>, config: IsolationForestConfig) -> Result<Self, ScanError> {
        let n_rows = data.nrows();
        if n_rows == 0 {
            return Err(ScanError::EmptyFeatureMatrix);
        }

        let sample_size = config.max_samples.min(n_rows).max(1);
        let height_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..config.n_trees.max(1))
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
                let rows = rand::seq::index::sample(&mut rng, n_rows, sample_size).into_vec();
                IsolationTree::build(data, rows, height_limit, &mut rng)
            })
            .collect();

        Ok(Self { trees, sample_size })
    }

    /// Anomaly score of one row; negative is anomalous.
    pub fn score(&self, sample: ArrayView1<f64>) -> f64 {
        let normaliser = average_path_length(self.sample_size);
        if normaliser == 0.0 {
            return 0.0;
        }
        let mean_path = self.trees.iter().map(|t| t.path_length(sample)).sum::<f64>()
            / self.trees.len() as f64;
        0.5 - 2f64.powf(-mean_path / normaliser)
    }

    pub fn score_all(&self, data: &Array2<f64>) -> Vec<f64> {
        data.axis_iter(Axis(0)).map(|row| self.score(row)).collect()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Stacks feature vectors into a row-per-symbol matrix.
pub fn feature_matrix(vectors: &[FeatureVector]) -> Result<Array2<f64>, ScanError> {
    let Some(first) = vectors.first() else {
        return Err(ScanError::EmptyFeatureMatrix);
    };
    let width = first.len();

    let mut flat = Vec::with_capacity(vectors.len() * width);
    for (row, vector) in vectors.iter().enumerate() {
        if vector.len() != width {
            return Err(ScanError::RaggedFeatureMatrix {
                expected: width,
                row,
                actual: vector.len(),
            });
        }
        flat.extend_from_slice(vector.values());
    }

    Array2::from_shape_vec((vectors.len(), width), flat)
        .map_err(|e| ScanError::Io(anyhow::anyhow!("Failed to shape feature matrix: {}", e)))
}

/// Fits a forest on `vectors` and scores every row.
pub fn score_vectors(
    vectors: &[FeatureVector],
    config: IsolationForestConfig,
) -> Result<Vec<f64>, ScanError> {
    let matrix = feature_matrix(vectors)?;
    let forest = IsolationForest::fit(&matrix, config)?;
    Ok(forest.score_all(&matrix))
}
