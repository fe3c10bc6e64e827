//! Truncated views over datasets for the overfit and fast-dev runs.

use burn::data::dataset::{
    Dataset,
    transform::{PartialDataset, ShuffledDataset},
};

/// A seeded permutation of a dataset, cut to a prefix.
pub type Subset<D, I> = PartialDataset<ShuffledDataset<D, I>, I>;

/// Number of items a `fraction` of `len` covers, never less than one.
#[must_use]
pub fn fraction_len(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    ((len as f64 * fraction).ceil() as usize).clamp(1, len)
}

/// `n` items drawn from `dataset` without replacement (all of them if there are fewer).
///
/// Image folders are sorted by class, so a plain prefix would hold a single class.
pub fn sample_n<D, I>(dataset: D, n: usize, seed: u64) -> Subset<D, I>
where
    D: Dataset<I>,
    I: Clone + Send + Sync,
{
    let end = n.min(dataset.len());
    PartialDataset::new(ShuffledDataset::with_seed(dataset, seed), 0, end)
}

/// The whole dataset behind the same view type as `sample_n`.
pub fn whole<D, I>(dataset: D, seed: u64) -> Subset<D, I>
where
    D: Dataset<I>,
    I: Clone + Send + Sync,
{
    let end = dataset.len();
    sample_n(dataset, end, seed)
}
