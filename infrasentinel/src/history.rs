//! Rolling sample window feeding the metrics chart, plus timestamp labels.

use chrono::{DateTime, Local, NaiveDateTime};
use std::collections::VecDeque;

use crate::types::Sample;

/// Selectable chart ranges, in samples.
pub const RANGE_PRESETS: [usize; 4] = [20, 50, 100, 200];
pub const DEFAULT_RANGE: usize = 50;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    dq.push_back(v);
    while dq.len() > cap {
        dq.pop_front();
    }
}

/// Parallel sequences handed to the chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub labels: Vec<String>,
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub disk: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Fixed-capacity window, oldest sample at the front.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<Sample>,
    cap: usize,
}

impl SampleWindow {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Shrinking drops the oldest samples so the bound holds immediately.
    pub fn set_capacity(&mut self, cap: usize) {
        self.cap = cap.max(1);
        while self.samples.len() > self.cap {
            self.samples.pop_front();
        }
    }

    /// Discard contents and store `samples` (oldest first). Keeps the newest `cap`.
    pub fn replace(&mut self, samples: Vec<Sample>) {
        self.samples.clear();
        let skip = samples.len().saturating_sub(self.cap);
        self.samples.extend(samples.into_iter().skip(skip));
    }

    pub fn push_one(&mut self, sample: Sample) {
        push_capped(&mut self.samples, sample, self.cap);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_series(&self) -> Series {
        let mut s = Series {
            labels: Vec::with_capacity(self.samples.len()),
            cpu: Vec::with_capacity(self.samples.len()),
            memory: Vec::with_capacity(self.samples.len()),
            disk: Vec::with_capacity(self.samples.len()),
        };
        for x in &self.samples {
            s.labels.push(fmt_time(&x.at));
            s.cpu.push(x.cpu);
            s.memory.push(x.memory);
            s.disk.push(x.disk);
        }
        s
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_RANGE)
    }
}

// Backend timestamps are either RFC 3339 ("...Z") or naive ISO ("2024-05-01T10:00:05.123456").
fn parse_timestamp(ts: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// "HH:MM:SS"; unparseable input comes back unchanged.
pub fn fmt_time(ts: &str) -> String {
    parse_timestamp(ts)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// "Mon D, HH:MM"
pub fn fmt_datetime(ts: &str) -> String {
    parse_timestamp(ts)
        .map(|t| t.format("%b %-d, %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(i: usize) -> Sample {
        Sample {
            at: format!("2024-05-01T10:00:{:02}", i % 60),
            cpu: i as f64,
            memory: (i * 2) as f64,
            disk: 50.0,
        }
    }

    #[test]
    fn push_never_exceeds_capacity_and_keeps_newest() {
        for cap in [1usize, 3, 50] {
            let mut w = SampleWindow::new(cap);
            for n in 0..(cap * 3 + 2) {
                w.push_one(s(n));
                assert!(w.len() <= cap);
                let pushed = n + 1;
                let expect: Vec<f64> = (pushed.saturating_sub(cap)..pushed).map(|i| i as f64).collect();
                assert_eq!(w.as_series().cpu, expect);
            }
        }
    }

    #[test]
    fn replace_then_push_truncates_from_front() {
        let mut w = SampleWindow::new(5);
        w.replace((0..3).map(s).collect());
        assert_eq!(w.as_series().cpu, vec![0.0, 1.0, 2.0]);
        for i in 3..8 {
            w.push_one(s(i));
        }
        assert_eq!(w.as_series().cpu, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn replace_keeps_newest_when_input_exceeds_capacity() {
        let mut w = SampleWindow::new(2);
        w.push_one(s(99));
        w.replace((0..4).map(s).collect());
        assert_eq!(w.as_series().cpu, vec![2.0, 3.0]);
    }

    #[test]
    fn shrinking_capacity_keeps_newest() {
        let mut w = SampleWindow::new(4);
        w.replace((0..4).map(s).collect());
        w.set_capacity(2);
        assert_eq!(w.len(), 2);
        assert_eq!(w.as_series().cpu, vec![2.0, 3.0]);
        w.push_one(s(4));
        assert_eq!(w.as_series().cpu, vec![3.0, 4.0]);
    }

    #[test]
    fn series_is_parallel_and_labelled() {
        let mut w = SampleWindow::default();
        w.push_one(s(5));
        w.push_one(s(6));
        let series = w.as_series();
        assert_eq!(series.len(), 2);
        assert_eq!(series.labels, vec!["10:00:05", "10:00:06"]);
        assert_eq!(series.memory, vec![10.0, 12.0]);
        assert_eq!(series.disk, vec![50.0, 50.0]);
    }

    #[test]
    fn time_labels() {
        assert_eq!(fmt_time("2024-05-01T07:08:09.123456"), "07:08:09");
        assert_eq!(fmt_time("not a time"), "not a time");
        assert_eq!(fmt_datetime("2024-05-01T07:08:09"), "May 1, 07:08");
    }
}
