//! Selection of one answer among a tier's results

use groundtruth_domain::FinancialMetric;
use std::cmp::Ordering;

/// A module's result, tagged with the module's registration index
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Registration order of the producing module (0 = first)
    pub index: usize,
    /// The result
    pub metric: FinancialMetric,
}

impl Candidate {
    /// Create a candidate
    pub fn new(index: usize, metric: FinancialMetric) -> Self {
        Self { index, metric }
    }
}

/// Ordering where `Less` means "preferred"
///
/// Highest confidence first; then most recent timestamp; then the module
/// registered first.
pub fn preference(a: &Candidate, b: &Candidate) -> Ordering {
    b.metric
        .confidence
        .value()
        .total_cmp(&a.metric.confidence.value())
        .then_with(|| b.metric.timestamp.cmp(&a.metric.timestamp))
        .then_with(|| a.index.cmp(&b.index))
}

/// Pick the preferred candidate
///
/// Independent of input order, so module completion order never affects the
/// outcome.
pub fn select_best<I>(candidates: I) -> Option<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    candidates.into_iter().min_by(preference)
}
