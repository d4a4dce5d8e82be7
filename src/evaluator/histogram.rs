//! Equal-width histograms over prices for sale and numeric attributes
//!
//! Buckets span `[min, max]` of the observed values. The last bucket is
//! closed on both ends, so every value lands in exactly one bucket.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::candidate::CandidateSet;
use super::context::QueryContext;
use super::price::PriceInterval;
use crate::catalog::{CollectionIndex, PriceType};
use crate::query::{FilterBy, FilterConstraint, HistogramBehavior};

/// One histogram bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Lower bound, inclusive
    pub threshold: Decimal,
    pub occurrences: u64,
    /// The bucket overlaps the interval the query filters by
    pub requested: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    pub min: Decimal,
    pub max: Decimal,
    pub overall_count: u64,
    pub buckets: Vec<Bucket>,
}

/// Builds histograms with a fixed bucket strategy
#[derive(Debug, Clone, Copy)]
pub struct HistogramBuilder {
    bucket_count: usize,
    behavior: HistogramBehavior,
}

impl HistogramBuilder {
    pub fn new(bucket_count: usize, behavior: HistogramBehavior) -> Self {
        Self {
            bucket_count: bucket_count.max(1),
            behavior,
        }
    }

    /// Histogram of the values, `None` when there are none
    pub fn build(&self, values: &[Decimal], requested: Option<&PriceInterval>) -> Option<Histogram> {
        let min = values.iter().min().copied()?;
        let max = values.iter().max().copied()?;
        if min == max {
            return Some(Histogram {
                min,
                max,
                overall_count: values.len() as u64,
                buckets: vec![Bucket {
                    threshold: min,
                    occurrences: values.len() as u64,
                    requested: requested.map_or(false, |r| r.contains(min)),
                }],
            });
        }

        let mut count = self.bucket_count;
        loop {
            let occurrences = distribute(values, min, max, count);
            let settled = match self.behavior {
                HistogramBehavior::Standard => true,
                HistogramBehavior::Optimized => count == 1 || occurrences.iter().all(|o| *o > 0),
            };
            if settled {
                let buckets = occurrences
                    .into_iter()
                    .enumerate()
                    .map(|(i, occurrences)| {
                        let threshold = bound(min, max, count, i);
                        let upper = bound(min, max, count, i + 1);
                        Bucket {
                            threshold,
                            occurrences,
                            requested: requested.map_or(false, |r| overlaps(r, threshold, upper)),
                        }
                    })
                    .collect();
                return Some(Histogram {
                    min,
                    max,
                    overall_count: values.len() as u64,
                    buckets,
                });
            }
            count -= 1;
        }
    }

    /// Histogram of the prices for sale of the candidates
    pub fn prices(&self, candidates: &CandidateSet, price_type: PriceType, requested: Option<&PriceInterval>) -> Option<Histogram> {
        let values: Vec<Decimal> = candidates.priced().map(|(_, p)| p.amount(price_type)).collect();
        self.build(&values, requested)
    }

    /// Histogram of a numeric attribute over the candidates
    pub fn attribute(
        &self,
        ctx: &QueryContext<'_>,
        collection: &dyn CollectionIndex,
        candidates: &CandidateSet,
        name: &str,
        filter_by: &FilterBy,
    ) -> Option<Histogram> {
        let localized = collection
            .schema()
            .attribute(name)
            .map_or(false, |a| a.localized);
        let locale = ctx.locale_for(localized);
        let store = collection.entities();
        let values: Vec<Decimal> = candidates
            .ids
            .iter()
            .filter_map(|pk| {
                store
                    .get(pk)?
                    .attributes
                    .lookup(name, locale)?
                    .as_single()?
                    .as_decimal()
            })
            .collect();
        self.build(&values, requested_range(filter_by, name).as_ref())
    }
}

/// Occurrences per bucket; index = floor((v - min) * count / (max - min))
fn distribute(values: &[Decimal], min: Decimal, max: Decimal, count: usize) -> Vec<u64> {
    let span = max - min;
    let scale = Decimal::from(count as u64);
    let mut occurrences = vec![0u64; count];
    for value in values {
        let index = ((*value - min) * scale / span)
            .floor()
            .to_usize()
            .unwrap_or(0)
            .min(count - 1);
        occurrences[index] += 1;
    }
    occurrences
}

fn bound(min: Decimal, max: Decimal, count: usize, index: usize) -> Decimal {
    if index >= count {
        return max;
    }
    min + (max - min) * Decimal::from(index as u64) / Decimal::from(count as u64)
}

fn overlaps(interval: &PriceInterval, lower: Decimal, upper: Decimal) -> bool {
    interval.from.map_or(true, |from| from <= upper) && interval.to.map_or(true, |to| lower <= to)
}

/// Interval of an `attributeBetween` over the attribute, if the filter has one
fn requested_range(filter_by: &FilterBy, attribute: &str) -> Option<PriceInterval> {
    match filter_by.find(|c| matches!(c, FilterConstraint::AttributeBetween { name, .. } if name == attribute))? {
        FilterConstraint::AttributeBetween { from, to, .. } => Some(PriceInterval {
            from: from.as_ref().and_then(|s| s.as_decimal()),
            to: to.as_ref().and_then(|s| s.as_decimal()),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    fn occurrences(histogram: &Histogram) -> Vec<u64> {
        histogram.buckets.iter().map(|b| b.occurrences).collect()
    }

    #[test]
    fn test_equal_width_buckets() {
        let builder = HistogramBuilder::new(4, HistogramBehavior::Standard);
        let histogram = builder.build(&decimals(&[0, 1, 2, 5, 7, 8]), None).unwrap();
        assert_eq!(histogram.min, Decimal::from(0));
        assert_eq!(histogram.max, Decimal::from(8));
        assert_eq!(occurrences(&histogram), vec![2, 1, 1, 2]);
        let thresholds: Vec<Decimal> = histogram.buckets.iter().map(|b| b.threshold).collect();
        assert_eq!(thresholds, decimals(&[0, 2, 4, 6]));
    }

    #[test]
    fn test_single_value_single_bucket() {
        let builder = HistogramBuilder::new(10, HistogramBehavior::Standard);
        let histogram = builder.build(&decimals(&[3, 3, 3]), None).unwrap();
        assert_eq!(occurrences(&histogram), vec![3]);
    }

    #[test]
    fn test_empty_values_have_no_histogram() {
        let builder = HistogramBuilder::new(3, HistogramBehavior::Standard);
        assert!(builder.build(&[], None).is_none());
    }

    #[test]
    fn test_optimized_removes_empty_buckets() {
        let values = decimals(&[0, 1, 9, 10]);
        let standard = HistogramBuilder::new(5, HistogramBehavior::Standard).build(&values, None).unwrap();
        assert!(standard.buckets.iter().any(|b| b.occurrences == 0));
        let optimized = HistogramBuilder::new(5, HistogramBehavior::Optimized).build(&values, None).unwrap();
        assert_eq!(occurrences(&optimized), vec![2, 2]);
    }

    #[test]
    fn test_requested_buckets() {
        let builder = HistogramBuilder::new(4, HistogramBehavior::Standard);
        let interval = PriceInterval {
            from: Some(Decimal::from(5)),
            to: None,
        };
        let histogram = builder.build(&decimals(&[0, 8]), Some(&interval)).unwrap();
        let requested: Vec<bool> = histogram.buckets.iter().map(|b| b.requested).collect();
        assert_eq!(requested, vec![false, false, true, true]);
    }

    proptest! {
        #[test]
        fn prop_occurrences_sum_to_value_count(
            values in proptest::collection::vec(-1_000i64..1_000, 1..60),
            buckets in 1usize..12,
            optimized in any::<bool>(),
        ) {
            let behavior = if optimized { HistogramBehavior::Optimized } else { HistogramBehavior::Standard };
            let histogram = HistogramBuilder::new(buckets, behavior)
                .build(&decimals(&values), None)
                .unwrap();
            let total: u64 = histogram.buckets.iter().map(|b| b.occurrences).sum();
            prop_assert_eq!(total, values.len() as u64);
            prop_assert_eq!(histogram.overall_count, values.len() as u64);
            prop_assert!(histogram.buckets.len() <= buckets);
        }
    }
}
