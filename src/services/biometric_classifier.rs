// src/services/biometric_classifier.rs
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ModelError;

pub const FEATURE_COUNT: usize = 6;

/// One wrist-sensor reading in the order the forest was trained on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiometricSample {
    pub acc_x: f64,
    pub acc_y: f64,
    pub acc_z: f64,
    pub bvp: f64,
    pub eda: f64,
    pub temp: f64,
}

impl Default for BiometricSample {
    fn default() -> Self {
        Self {
            acc_x: 0.02,
            acc_y: 0.05,
            acc_z: 0.01,
            bvp: 0.35,
            eda: 0.8,
            temp: 36.7,
        }
    }
}

impl BiometricSample {
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [self.acc_x, self.acc_y, self.acc_z, self.bvp, self.eda, self.temp]
    }
}

impl FromStr for BiometricSample {
    type Err = String;

    /// Parses `accX,accY,accZ,BVP,EDA,TEMP`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;
        match values[..] {
            [acc_x, acc_y, acc_z, bvp, eda, temp] => Ok(Self {
                acc_x,
                acc_y,
                acc_z,
                bvp,
                eda,
                temp,
            }),
            _ => Err(format!(
                "expected {FEATURE_COUNT} comma-separated values, got {}",
                values.len()
            )),
        }
    }
}

/// Scores feature rows, returning one class value per row.
pub trait BiometricClassifier: Send + Sync {
    fn predict(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<f64>;
}

/// Any non-zero class on the first row counts as stressed.
pub fn is_stressed(predictions: &[f64]) -> bool {
    predictions.first().is_some_and(|class| *class != 0.0)
}

#[derive(Debug, Clone, Deserialize)]
struct TreeArtifact {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct ForestArtifact {
    classes: Vec<f64>,
    n_features: usize,
    trees: Vec<TreeArtifact>,
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_artifact(t: TreeArtifact, n_classes: usize, n_features: usize) -> Result<Self, String> {
        let n = t.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [t.children_right.len(), t.feature.len(), t.threshold.len(), t.value.len()]
            .iter()
            .any(|len| *len != n)
        {
            return Err("tree node arrays differ in length".to_string());
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            if t.value[i].len() != n_classes {
                return Err(format!(
                    "node {i} has {} class weights, expected {n_classes}",
                    t.value[i].len()
                ));
            }
            if t.children_left[i] == -1 {
                let total: f64 = t.value[i].iter().sum();
                let distribution = if total > 0.0 {
                    t.value[i].iter().map(|v| v / total).collect()
                } else {
                    vec![0.0; n_classes]
                };
                nodes.push(Node::Leaf { distribution });
                continue;
            }

            let child = |raw: i64| -> Result<usize, String> {
                usize::try_from(raw)
                    .ok()
                    .filter(|c| *c > i && *c < n)
                    .ok_or_else(|| format!("node {i} has invalid child index {raw}"))
            };
            let feature = usize::try_from(t.feature[i])
                .ok()
                .filter(|f| *f < n_features)
                .ok_or_else(|| format!("node {i} splits on invalid feature {}", t.feature[i]))?;
            nodes.push(Node::Split {
                feature,
                threshold: t.threshold[i],
                left: child(t.children_left[i])?,
                right: child(t.children_right[i])?,
            });
        }
        Ok(Self { nodes })
    }

    /// Child indices always exceed the parent's, so the walk terminates.
    fn leaf(&self, row: &[f64; FEATURE_COUNT]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { distribution } => return distribution,
            }
        }
    }
}

/// Random forest exported from a tree-ensemble trainer as JSON.
#[derive(Debug, Clone)]
pub struct ForestModel {
    classes: Vec<f64>,
    trees: Vec<Tree>,
}

impl ForestModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: ForestArtifact =
            serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_artifact(artifact).map_err(|reason| ModelError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }

    fn from_artifact(artifact: ForestArtifact) -> Result<Self, String> {
        if artifact.classes.is_empty() {
            return Err("no classes defined".to_string());
        }
        if artifact.n_features != FEATURE_COUNT {
            return Err(format!(
                "model expects {} features, samples carry {FEATURE_COUNT}",
                artifact.n_features
            ));
        }
        if artifact.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }

        let n_classes = artifact.classes.len();
        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                Tree::from_artifact(t, n_classes, artifact.n_features)
                    .map_err(|e| format!("tree {i}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            classes: artifact.classes,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree leaf distributions.
    pub fn predict_proba(&self, row: &[f64; FEATURE_COUNT]) -> Vec<f64> {
        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            acc.iter_mut()
                .zip(tree.leaf(row))
                .for_each(|(a, p)| *a += p);
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }
}

impl BiometricClassifier for ForestModel {
    fn predict(&self, rows: &[[f64; FEATURE_COUNT]]) -> Vec<f64> {
        rows.iter()
            .map(|row| {
                let proba = self.predict_proba(row);
                // first index wins on ties
                let best = proba
                    .iter()
                    .enumerate()
                    .fold(0, |best, (i, p)| if *p > proba[best] { i } else { best });
                self.classes[best]
            })
            .collect()
    }
}
