// Integer Histogram
//
// Fixed-width histogram over a known integer domain, used to estimate
// predicate selectivity for table statistics. Space and per-value time are
// constant in the number of values histogrammed.

use crate::execution::predicate::Op;

pub struct IntHistogram {
    buckets: Vec<u64>,
    min: i64,
    max: i64,
    width: f64,
    total: u64,
}

impl IntHistogram {
    /// Create a histogram with `buckets` equal-width buckets covering
    /// `[min, max]`.
    pub fn new(buckets: usize, min: i64, max: i64) -> Self {
        let buckets = buckets.max(1);
        let width = ((max - min + 1) as f64 / buckets as f64).max(1.0);
        Self {
            buckets: vec![0; buckets],
            min,
            max,
            width,
            total: 0,
        }
    }

    /// Record one value. Values outside `[min, max]` are ignored.
    pub fn add_value(&mut self, v: i64) {
        if let Some(idx) = self.bucket_of(v) {
            self.buckets[idx] += 1;
            self.total += 1;
        }
    }

    /// Estimated fraction of recorded values satisfying `v_field op v`.
    pub fn estimate_selectivity(&self, op: Op, v: i64) -> f64 {
        match op {
            Op::Equals => self.selectivity_equals(v),
            Op::NotEquals => 1.0 - self.selectivity_equals(v),
            Op::GreaterThan => self.selectivity_greater(v, false),
            Op::GreaterThanOrEq => self.selectivity_greater(v, true),
            Op::LessThan => 1.0 - self.selectivity_greater(v, true),
            Op::LessThanOrEq => 1.0 - self.selectivity_greater(v, false),
        }
    }

    fn bucket_of(&self, v: i64) -> Option<usize> {
        if v < self.min || v > self.max {
            return None;
        }
        let idx = ((v - self.min) as f64 / self.width) as usize;
        Some(idx.min(self.buckets.len() - 1))
    }

    fn selectivity_equals(&self, v: i64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        match self.bucket_of(v) {
            Some(idx) => {
                let height = self.buckets[idx] as f64;
                (height / self.width) / self.total as f64
            }
            None => 0.0,
        }
    }

    fn selectivity_greater(&self, v: i64, inclusive: bool) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        if v < self.min {
            return 1.0;
        }
        if v > self.max {
            return 0.0;
        }

        let idx = match self.bucket_of(v) {
            Some(idx) => idx,
            None => return 0.0,
        };

        // Fraction of the value's own bucket lying to the right of v
        let bucket_right = self.min as f64 + (idx as f64 + 1.0) * self.width;
        let mut in_bucket = (bucket_right - v as f64 - 1.0) / self.width;
        if inclusive {
            in_bucket += 1.0 / self.width;
        }
        let mut selectivity =
            in_bucket.clamp(0.0, 1.0) * self.buckets[idx] as f64 / self.total as f64;

        // Whole buckets strictly to the right
        for &height in &self.buckets[idx + 1..] {
            selectivity += height as f64 / self.total as f64;
        }

        selectivity.clamp(0.0, 1.0)
    }
}
