use std::collections::BTreeMap;

use chrono::NaiveTime;

use crate::models::Day;

/// Anything that occupies a weekly `[start, end)` window on one day.
pub trait Meeting {
    fn day(&self) -> Day;
    fn start(&self) -> NaiveTime;
    fn end(&self) -> NaiveTime;
}

/// Whether two half-open intervals `[start_a, end_a)` and `[start_b, end_b)` overlap.
///
/// Touching endpoints do not overlap.
#[inline]
pub fn overlaps<T: Ord>(start_a: T, end_a: T, start_b: T, end_b: T) -> bool {
    start_a < end_b && start_b < end_a
}

/// The shared window of two intervals, if they overlap.
pub fn overlap_window<T: Ord + Copy>(
    start_a: T,
    end_a: T,
    start_b: T,
    end_b: T,
) -> Option<(T, T)> {
    if overlaps(start_a, end_a, start_b, end_b) {
        Some((start_a.max(start_b), end_a.min(end_b)))
    } else {
        None
    }
}

/// All pairs of meetings that overlap on the same day.
///
/// Meetings are grouped per day and sorted by start; each one is compared
/// only with the meetings that start before it ends. Pairs come out ordered
/// by day, then by the start of the earlier meeting.
pub fn overlapping_pairs<T: Meeting>(items: &[T]) -> Vec<(&T, &T)> {
    let mut by_day: BTreeMap<Day, Vec<&T>> = BTreeMap::new();
    for item in items {
        by_day.entry(item.day()).or_default().push(item);
    }

    let mut pairs = Vec::new();
    for (_, mut meetings) in by_day {
        meetings.sort_by_key(|m| m.start());

        for (i, current) in meetings.iter().enumerate() {
            for next in &meetings[i + 1..] {
                if next.start() >= current.end() {
                    break;
                }
                if overlaps(current.start(), current.end(), next.start(), next.end()) {
                    pairs.push((*current, *next));
                }
            }
        }
    }
    pairs
}
