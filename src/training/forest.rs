// RandomForest - bagged CART decision trees with Gini impurity
//
// Each tree is grown on a bootstrap resample of the (normalised) training
// rows. At every node the candidate features are visited in a random order;
// the search stops once `max_features` non-constant features have been
// examined and a split was found, otherwise it keeps going so a separable
// node is never left impure. Trees grow until their leaves are pure, the
// depth limit is hit, or a node is smaller than `min_samples_split`.
//
// Prediction is a hard majority vote. Ties go to the tied label predicted by
// the earliest tree in the ensemble.

use crate::analysis::classifier::MoodLabel;
use crate::analysis::features::FEATURE_COUNT;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub type Row = [f64; FEATURE_COUNT];

/// Forest growth parameters
#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_features: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub bootstrap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Node {
    Leaf {
        label: MoodLabel,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &Row) -> MoodLabel {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { label } => return *label,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // Out-of-range features only come from hand-edited files
                    let goes_left = row.get(*feature).map_or(false, |value| value <= threshold);
                    node = if goes_left { left } else { right };
                }
            }
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            Node::Leaf { .. } => true,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                *feature < FEATURE_COUNT
                    && threshold.is_finite()
                    && left.is_well_formed()
                    && right.is_well_formed()
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A single fitted CART tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    pub fn predict(&self, row: &Row) -> MoodLabel {
        self.root.predict(row)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

/// Ordered ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Grow `params.n_trees` trees over `rows`/`labels` using `rng`
    ///
    /// `rows` and `labels` must be non-empty and of equal length.
    pub fn fit(rows: &[Row], labels: &[MoodLabel], params: &ForestParams, rng: &mut StdRng) -> Self {
        let n = rows.len().min(labels.len());
        let mut trees = Vec::with_capacity(params.n_trees);

        for _ in 0..params.n_trees {
            let indices: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let mut builder = TreeBuilder {
                rows,
                labels,
                params,
                rng: &mut *rng,
            };
            trees.push(DecisionTree {
                root: builder.grow(indices, 0),
            });
        }

        Self { trees }
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Majority vote over every tree
    ///
    /// Returns `Unknown` for an empty forest.
    pub fn predict(&self, row: &Row) -> MoodLabel {
        let votes: Vec<MoodLabel> = self.trees.iter().map(|tree| tree.predict(row)).collect();
        majority_vote(&votes).unwrap_or(MoodLabel::Unknown)
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(|tree| tree.root.is_well_formed())
    }
}

/// Most frequent label; ties go to the tied label that appears first
fn majority_vote(votes: &[MoodLabel]) -> Option<MoodLabel> {
    let counts = label_counts(votes.iter().copied());
    let max = counts.iter().map(|(_, count)| *count).max()?;
    votes
        .iter()
        .copied()
        .find(|label| counts.iter().any(|(l, c)| l == label && *c == max))
}

fn label_counts(labels: impl Iterator<Item = MoodLabel>) -> Vec<(MoodLabel, usize)> {
    let mut counts: Vec<(MoodLabel, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(l, _)| *l == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
}

/// Gini impurity: 1 - Σ p_k²
fn gini(counts: &[(MoodLabel, usize)], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|(_, c)| (*c as f64 / total).powi(2))
        .sum::<f64>()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    rows: &'a [Row],
    labels: &'a [MoodLabel],
    params: &'a ForestParams,
    rng: &'a mut StdRng,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> Node {
        let counts = label_counts(indices.iter().map(|&i| self.labels[i]));
        let leaf = Node::Leaf {
            label: leaf_label(&counts),
        };

        let depth_reached = self.params.max_depth.map_or(false, |max| depth >= max);
        if counts.len() <= 1 || depth_reached || indices.len() < self.params.min_samples_split {
            return leaf;
        }

        let Some(split) = self.best_split(&indices) else {
            return leaf;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(left, depth + 1)),
            right: Box::new(self.grow(right, depth + 1)),
        }
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..FEATURE_COUNT).collect();
        features.shuffle(&mut *self.rng);

        let mut best: Option<BestSplit> = None;
        let mut visited = 0;

        for feature in features {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }

            let mut values: Vec<(f64, MoodLabel)> = indices
                .iter()
                .map(|&i| (self.rows[i][feature], self.labels[i]))
                .collect();
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

            let (Some(first), Some(last)) = (values.first(), values.last()) else {
                continue;
            };
            if first.0 >= last.0 {
                continue;
            }
            visited += 1;

            let total = values.len();
            let mut left_counts: Vec<(MoodLabel, usize)> = Vec::new();
            let mut right_counts = label_counts(values.iter().map(|(_, l)| *l));

            for pos in 1..total {
                let moved = values[pos - 1].1;
                add_count(&mut left_counts, moved, 1);
                add_count(&mut right_counts, moved, -1);

                if values[pos].0 <= values[pos - 1].0 {
                    continue;
                }

                let impurity = (pos as f64 * gini(&left_counts, pos)
                    + (total - pos) as f64 * gini(&right_counts, total - pos))
                    / total as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (values[pos - 1].0 + values[pos].0) / 2.0,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn add_count(counts: &mut Vec<(MoodLabel, usize)>, label: MoodLabel, delta: isize) {
    match counts.iter_mut().find(|(l, _)| *l == label) {
        Some((_, count)) => *count = count.saturating_add_signed(delta),
        None if delta > 0 => counts.push((label, delta as usize)),
        None => {}
    }
}

/// Most frequent label in a node; ties go to the earliest label in `MoodLabel::ALL`
fn leaf_label(counts: &[(MoodLabel, usize)]) -> MoodLabel {
    let Some(max) = counts.iter().map(|(_, c)| *c).max() else {
        return MoodLabel::Unknown;
    };
    MoodLabel::ALL
        .iter()
        .copied()
        .find(|label| counts.iter().any(|(l, c)| l == label && *c == max))
        .unwrap_or(MoodLabel::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn params(n_trees: usize, bootstrap: bool) -> ForestParams {
        ForestParams {
            n_trees,
            max_features: 4,
            max_depth: None,
            min_samples_split: 2,
            bootstrap,
        }
    }

    fn row_with(slot: usize, value: f64) -> Row {
        let mut row = [0.0; FEATURE_COUNT];
        row[slot] = value;
        row
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[(MoodLabel::Sad, 4)], 4), 0.0);
        assert_eq!(gini(&[(MoodLabel::Sad, 2), (MoodLabel::Happy, 2)], 4), 0.5);
    }

    #[test]
    fn test_majority_vote_tie_goes_to_first_tree() {
        use MoodLabel::*;
        assert_eq!(majority_vote(&[Happy, Sad, Sad, Happy]), Some(Happy));
        assert_eq!(majority_vote(&[Vibe, Sad, Sad]), Some(Sad));
        assert_eq!(majority_vote(&[]), None);
    }

    #[test]
    fn test_single_tree_separates_training_rows() {
        let rows = vec![row_with(3, -1.0), row_with(3, 1.0), row_with(17, 5.0)];
        let labels = vec![MoodLabel::Sad, MoodLabel::Happy, MoodLabel::Vibe];
        let mut rng = StdRng::seed_from_u64(42);

        let forest = RandomForest::fit(&rows, &labels, &params(1, false), &mut rng);
        for (row, label) in rows.iter().zip(labels.iter()) {
            assert_eq!(forest.predict(row), *label);
        }
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let rows: Vec<Row> = (0..8).map(|i| row_with(0, i as f64)).collect();
        let labels: Vec<MoodLabel> = (0..8).map(|i| MoodLabel::ALL[i % 4]).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let mut limited = params(3, false);
        limited.max_depth = Some(1);

        let forest = RandomForest::fit(&rows, &labels, &limited, &mut rng);
        assert!(forest.trees().iter().all(|tree| tree.depth() <= 1));
    }

    #[test]
    fn test_out_of_range_split_feature_does_not_panic() {
        let json = r#"{"trees":[{"root":{"type":"split","feature":99,"threshold":0.0,
            "left":{"type":"leaf","label":"sad"},"right":{"type":"leaf","label":"happy"}}}]}"#;
        let forest: RandomForest = serde_json::from_str(json).unwrap();

        assert!(!forest.is_well_formed());
        assert_eq!(forest.predict(&row_with(0, -1.0)), MoodLabel::Happy);
    }

    #[test]
    fn test_fit_is_deterministic_for_seed() {
        let rows = vec![row_with(0, 1.0), row_with(1, 1.0), row_with(2, 1.0), row_with(3, 1.0)];
        let labels = vec![
            MoodLabel::Sad,
            MoodLabel::Happy,
            MoodLabel::Vibe,
            MoodLabel::Motivation,
        ];

        let a = RandomForest::fit(&rows, &labels, &params(20, true), &mut StdRng::seed_from_u64(42));
        let b = RandomForest::fit(&rows, &labels, &params(20, true), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }
}
