//! Read-side projections over a partition set.
//!
//! Everything here is a pure function of the set: always safe to call,
//! never fails. Missing partitions or attributes count as zero.

use crate::config::{BoardConfig, BucketSpec};
use crate::partition_set::PartitionSet;
use crate::types::{OrderedItem, PartitionKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Number of items in a partition
pub fn count_by_partition(set: &PartitionSet, key: &PartitionKey) -> usize {
    set.partition(key).map(|p| p.len()).unwrap_or(0)
}

/// Sum a numeric attribute over one partition
pub fn sum_attribute<F>(set: &PartitionSet, key: &PartitionKey, selector: F) -> f64
where
    F: Fn(&OrderedItem) -> Option<f64>,
{
    set.items_in(key).filter_map(selector).sum()
}

/// Selector reading a numeric attribute by name, for use with
/// [`sum_attribute`] and [`bucket_by`]
pub fn number_attribute(name: &str) -> impl Fn(&OrderedItem) -> Option<f64> + '_ {
    move |item| item.number(name)
}

/// Committed versus planned capacity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRatio {
    pub actual: f64,
    pub planned: f64,
    /// `actual / planned`, or 0 when nothing is planned
    pub ratio: f64,
    pub over_committed: bool,
}

/// Compare committed work against planned capacity
pub fn capacity_ratio(actual: f64, planned: f64) -> CapacityRatio {
    let ratio = if planned > 0.0 { actual / planned } else { 0.0 };
    CapacityRatio {
        actual,
        planned,
        ratio,
        over_committed: actual > planned,
    }
}

/// A named bucket starting at `min` (inclusive). It ends where the next
/// higher bucket starts; the highest bucket is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub min: f64,
}

impl Bucket {
    /// Create a bucket
    pub fn new(name: impl Into<String>, min: f64) -> Self {
        Self {
            name: name.into(),
            min,
        }
    }
}

impl From<&BucketSpec> for Bucket {
    fn from(spec: &BucketSpec) -> Self {
        Self::new(spec.name.clone(), spec.min)
    }
}

/// Count items of one partition per bucket.
///
/// Every bucket appears in the result, in the order given, even when
/// empty. Items the discriminator cannot read, or that fall below every
/// bucket, are not counted.
pub fn bucket_by<F>(
    set: &PartitionSet,
    key: &PartitionKey,
    discriminator: F,
    buckets: &[Bucket],
) -> IndexMap<String, usize>
where
    F: Fn(&OrderedItem) -> Option<f64>,
{
    let mut counts: IndexMap<String, usize> =
        buckets.iter().map(|b| (b.name.clone(), 0)).collect();

    for value in set.items_in(key).filter_map(&discriminator) {
        let home = buckets
            .iter()
            .filter(|b| value >= b.min)
            .max_by(|a, b| a.min.total_cmp(&b.min));
        if let Some(bucket) = home {
            if let Some(count) = counts.get_mut(&bucket.name) {
                *count += 1;
            }
        }
    }
    counts
}

/// Per-partition figures shown in column headers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionSummary {
    pub key: PartitionKey,
    pub count: usize,
    pub points: f64,
}

/// Everything the board renders besides the cards themselves.
///
/// Recomputed after every change to the partition set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub partitions: Vec<PartitionSummary>,
    pub total_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<CapacityRatio>,
    pub priority_buckets: IndexMap<String, usize>,
}

impl BoardSummary {
    /// Project a partition set using the configured attribute names
    pub fn compute(set: &PartitionSet, config: &BoardConfig) -> Self {
        let points = number_attribute(&config.story_points_attribute);
        let partitions: Vec<PartitionSummary> = set
            .keys()
            .map(|key| PartitionSummary {
                key: key.clone(),
                count: count_by_partition(set, key),
                points: sum_attribute(set, key, &points),
            })
            .collect();

        let capacity = match (&config.capacity_partition, config.planned_capacity) {
            (Some(key), Some(planned)) => {
                let key = PartitionKey::from(key.as_str());
                Some(capacity_ratio(sum_attribute(set, &key, &points), planned))
            }
            _ => None,
        };

        let buckets: Vec<Bucket> = config.priority_buckets.iter().map(Bucket::from).collect();
        let priority = number_attribute(&config.priority_attribute);
        let bucket_keys: Vec<PartitionKey> = match &config.priority_partition {
            Some(key) => vec![PartitionKey::from(key.as_str())],
            None => set.keys().cloned().collect(),
        };
        let mut priority_buckets: IndexMap<String, usize> =
            buckets.iter().map(|b| (b.name.clone(), 0)).collect();
        for key in &bucket_keys {
            for (name, count) in bucket_by(set, key, &priority, &buckets) {
                *priority_buckets.entry(name).or_default() += count;
            }
        }

        Self {
            total_items: set.item_count(),
            partitions,
            capacity,
            priority_buckets,
        }
    }

    /// Figures for one partition
    pub fn partition(&self, key: &str) -> Option<&PartitionSummary> {
        self.partitions.iter().find(|p| p.key.as_str() == key)
    }
}
