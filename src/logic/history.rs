//! Rolling transfer-rate history
//!
//! A bounded ring of timestamped rate samples used for charting. The buffer
//! keeps running maxima for both directions so a chart can scale its axis
//! without scanning every sample on each render.
//!
//! Invariant: after any insertion or eviction `max_download()` and
//! `max_upload()` equal the true maxima over the samples currently held.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::syncthing::TransferRate;

/// A single rate sample
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub download: f64,
    pub upload: f64,
}

/// Bounded time series of rate samples with cached maxima
#[derive(Clone, Debug, PartialEq)]
pub struct RollingHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
    max_download: f64,
    max_upload: f64,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            max_download: 0.0,
            max_upload: 0.0,
        }
    }

    /// Append a sample, evicting the oldest ones beyond capacity
    pub fn add_data_point(&mut self, timestamp: DateTime<Utc>, rate: TransferRate) {
        let download = sanitize(rate.download);
        let upload = sanitize(rate.upload);

        self.points.push_back(HistoryPoint {
            timestamp,
            download,
            upload,
        });
        self.max_download = self.max_download.max(download);
        self.max_upload = self.max_upload.max(upload);

        self.evict_overflow();
    }

    /// Change the bound, evicting the oldest samples if it shrank
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        if self.points.len() <= self.capacity {
            return;
        }

        let excess = self.points.len() - self.capacity;
        let mut evicted_download = 0.0_f64;
        let mut evicted_upload = 0.0_f64;
        for point in self.points.drain(..excess) {
            evicted_download = evicted_download.max(point.download);
            evicted_upload = evicted_upload.max(point.upload);
        }

        // Only a rescan when an evicted sample could have held the maximum
        if evicted_download >= self.max_download {
            self.max_download = self.points.iter().map(|p| p.download).fold(0.0, f64::max);
        }
        if evicted_upload >= self.max_upload {
            self.max_upload = self.points.iter().map(|p| p.upload).fold(0.0, f64::max);
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.max_download = 0.0;
        self.max_upload = 0.0;
    }

    pub fn points(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_download(&self) -> f64 {
        self.max_download
    }

    pub fn max_upload(&self) -> f64 {
        self.max_upload
    }
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(60)
    }
}

fn sanitize(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
    }

    fn true_max(history: &RollingHistory) -> (f64, f64) {
        history.points().fold((0.0_f64, 0.0_f64), |(d, u), p| {
            (d.max(p.download), u.max(p.upload))
        })
    }

    #[test]
    fn test_new_history_is_empty() {
        let history = RollingHistory::new(10);
        assert!(history.is_empty());
        assert_eq!(history.max_download(), 0.0);
        assert_eq!(history.max_upload(), 0.0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut history = RollingHistory::new(0);
        history.add_data_point(t(0), TransferRate::new(1.0, 1.0));
        history.add_data_point(t(1), TransferRate::new(2.0, 2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.max_download(), 2.0);
    }

    #[test]
    fn test_max_tracks_insertions() {
        let mut history = RollingHistory::new(5);
        history.add_data_point(t(0), TransferRate::new(10.0, 1.0));
        history.add_data_point(t(1), TransferRate::new(30.0, 5.0));
        history.add_data_point(t(2), TransferRate::new(20.0, 2.0));
        assert_eq!(history.max_download(), 30.0);
        assert_eq!(history.max_upload(), 5.0);
    }

    #[test]
    fn test_evicting_the_maximum_recomputes() {
        let mut history = RollingHistory::new(3);
        history.add_data_point(t(0), TransferRate::new(100.0, 50.0));
        history.add_data_point(t(1), TransferRate::new(10.0, 5.0));
        history.add_data_point(t(2), TransferRate::new(20.0, 1.0));
        history.add_data_point(t(3), TransferRate::new(15.0, 2.0));

        assert_eq!(history.len(), 3);
        assert_eq!(history.max_download(), 20.0);
        assert_eq!(history.max_upload(), 5.0);
    }

    #[test]
    fn test_evicting_a_non_maximum_keeps_cache() {
        let mut history = RollingHistory::new(2);
        history.add_data_point(t(0), TransferRate::new(1.0, 1.0));
        history.add_data_point(t(1), TransferRate::new(9.0, 9.0));
        history.add_data_point(t(2), TransferRate::new(3.0, 3.0));
        assert_eq!(history.max_download(), 9.0);
        assert_eq!(history.max_upload(), 9.0);
    }

    #[test]
    fn test_maximum_exact_after_heavy_eviction() {
        // Known peak among the first 10 points, 200 points into a 60-slot ring
        let mut history = RollingHistory::new(60);
        for i in 0..200_i64 {
            let rate = if i == 4 {
                TransferRate::new(1_000_000.0, 900_000.0)
            } else {
                TransferRate::new((i % 37) as f64 * 10.0, (i % 23) as f64 * 7.0)
            };
            history.add_data_point(t(i), rate);
            assert!(history.len() <= 60);
            assert_eq!((history.max_download(), history.max_upload()), true_max(&history));
        }

        assert_eq!(history.len(), 60);
        assert_eq!(history.max_download(), 360.0);
        assert_eq!(history.max_upload(), 154.0);
    }

    #[test]
    fn test_negative_and_nan_samples_are_zeroed() {
        let mut history = RollingHistory::new(4);
        history.add_data_point(t(0), TransferRate::new(-5.0, f64::NAN));
        let point = history.latest().unwrap();
        assert_eq!(point.download, 0.0);
        assert_eq!(point.upload, 0.0);
    }

    #[test]
    fn test_shrinking_capacity_evicts_oldest() {
        let mut history = RollingHistory::new(10);
        for i in 0..10 {
            history.add_data_point(t(i), TransferRate::new(100.0 - i as f64, 0.0));
        }
        history.set_capacity(4);
        assert_eq!(history.len(), 4);
        assert_eq!(history.points().next().unwrap().timestamp, t(6));
        assert_eq!(history.max_download(), 94.0);
    }

    #[test]
    fn test_clear_resets_maxima() {
        let mut history = RollingHistory::new(4);
        history.add_data_point(t(0), TransferRate::new(5.0, 5.0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.max_download(), 0.0);
    }
}
