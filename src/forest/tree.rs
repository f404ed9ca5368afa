use ndarray::ArrayView2;
use rand::{rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: Vec<f32>,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct TreeParams {
    pub n_classes: usize,
    pub max_features: usize,
    pub min_samples_split: usize,
    pub max_depth: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    feature: usize,
    threshold: f32,
    impurity: f64,
}

/// CART classification tree grown on Gini impurity, nodes stored in a flat
/// arena with the root at index 0.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Grows a tree over the rows named by `sample`. Rows may repeat, which
    /// is how bootstrap draws weight them.
    pub(crate) fn fit(
        x: ArrayView2<'_, f32>,
        y: &[usize],
        mut sample: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = DecisionTree { nodes: Vec::new() };
        tree.grow(x, y, &mut sample, 0, params, rng);
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn distribution(&self, row: &[f32]) -> &[f32] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
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

    fn grow(
        &mut self,
        x: ArrayView2<'_, f32>,
        y: &[usize],
        rows: &mut [usize],
        depth: usize,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let counts = class_counts(y, rows, params.n_classes);
        let node_id = self.nodes.len();

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let too_small = rows.len() < params.min_samples_split;
        let too_deep = params.max_depth.is_some_and(|max| depth >= max);
        let split = if pure || too_small || too_deep {
            None
        } else {
            best_split(x, y, rows, &counts, params, rng)
        };

        let Some(split) = split else {
            self.nodes.push(leaf(&counts, rows.len()));
            return node_id;
        };

        // Reserve the slot so children land after their parent.
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });

        let mid = partition(rows, |row| x[[row, split.feature]] <= split.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.grow(x, y, left_rows, depth + 1, params, rng);
        let right = self.grow(x, y, right_rows, depth + 1, params, rng);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }
}

fn best_split(
    x: ArrayView2<'_, f32>,
    y: &[usize],
    rows: &[usize],
    totals: &[usize],
    params: TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let mut features: Vec<usize> = (0..x.ncols()).collect();
    features.shuffle(rng);

    let n = rows.len();
    let mut best: Option<SplitCandidate> = None;
    let mut evaluated = 0;
    let mut sorted: Vec<(f32, usize)> = Vec::with_capacity(n);
    let mut left_counts = vec![0usize; params.n_classes];
    let mut right_counts = vec![0usize; params.n_classes];

    for feature in features {
        // Keep drawing past max_features until at least one usable split
        // turns up, otherwise the node would stop impure.
        if evaluated >= params.max_features && best.is_some() {
            break;
        }

        sorted.clear();
        sorted.extend(rows.iter().map(|&row| (x[[row, feature]], y[row])));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        if sorted[0].0 == sorted[n - 1].0 {
            continue;
        }
        evaluated += 1;

        left_counts.iter_mut().for_each(|c| *c = 0);
        for k in 0..n - 1 {
            let (value, class) = sorted[k];
            left_counts[class] += 1;
            let next = sorted[k + 1].0;
            if value == next {
                continue;
            }

            for ((right, total), left) in right_counts.iter_mut().zip(totals).zip(&left_counts) {
                *right = total - left;
            }
            let n_left = k + 1;
            let n_right = n - n_left;
            let impurity = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / n as f64;

            if best.is_none_or(|b| impurity < b.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: midpoint(value, next),
                    impurity,
                });
            }
        }
    }

    best
}

/// Threshold strictly below `hi`, so `lo` goes left and `hi` goes right.
fn midpoint(lo: f32, hi: f32) -> f32 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi { lo } else { mid }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0; n_classes];
    for &row in rows {
        counts[y[row]] += 1;
    }
    counts
}

fn leaf(counts: &[usize], n: usize) -> Node {
    let n = n.max(1) as f32;
    Node::Leaf {
        distribution: counts.iter().map(|&c| c as f32 / n).collect(),
    }
}

fn partition<F>(rows: &mut [usize], goes_left: F) -> usize
where
    F: Fn(usize) -> bool,
{
    let mut mid = 0;
    for i in 0..rows.len() {
        if goes_left(rows[i]) {
            rows.swap(i, mid);
            mid += 1;
        }
    }
    mid
}
