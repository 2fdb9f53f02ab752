use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One unit of study content. Immutable once fetched from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub title: String,
    /// Duration in seconds.
    pub length: u64,
    pub url: String,
}

/// Mapping from 1-based day number to that day's ordered item bucket.
/// Day numbers are contiguous starting at 1.
pub type Schedule = BTreeMap<u32, Vec<Item>>;

/// Distribute `items` across `days` contiguous day buckets.
///
/// Day `k` receives the slice `[(k-1)*per_day, k*per_day)` of the input
/// order with `per_day = ceil(len/days)`, so every day but the last
/// non-empty one is full and the input order is never shuffled. Trailing
/// days beyond the last item are kept as explicit empty buckets. An empty
/// item list or a zero day count yields an empty map.
pub fn build_schedule(items: &[Item], days: u32) -> Schedule {
    let mut schedule = Schedule::new();
    if items.is_empty() || days == 0 {
        return schedule;
    }
    let per_day = items.len().div_ceil(days as usize);
    for day in 1..=days {
        let start = ((day - 1) as usize) * per_day;
        let end = (start + per_day).min(items.len());
        let bucket = if start < items.len() {
            items[start..end].to_vec()
        } else {
            Vec::new()
        };
        schedule.insert(day, bucket);
    }
    schedule
}

pub fn total_seconds(items: &[Item]) -> u64 {
    items.iter().map(|item| item.length).sum()
}
