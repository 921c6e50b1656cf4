use crate::runtime::{
    convert::number_view,
    value::{compare, equal, Value},
};

#[derive(Clone, Debug)]
pub struct Counter {
    pub value: Value,
    pub count: u64,
    pub at_most: u64,
    pub at_least: u64,
    pub relative: f64,
    pub relative_at_most: f64,
    pub relative_at_least: f64,
}

impl Counter {
    fn new(value: Value) -> Self {
        Self {
            value,
            count: 0,
            at_most: 0,
            at_least: 0,
            relative: 0.0,
            relative_at_most: 0.0,
            relative_at_least: 0.0,
        }
    }
}

/// Frequency counts of the values observed while sampling an expression.
///
/// Cumulative fields of the counters are only meaningful once
/// [`Distribution::aggregate`] ran; the statistics aggregate on demand.
#[derive(Clone, Debug, Default)]
pub struct Distribution {
    counters: Vec<Counter>,
    total: u64,
    aggregated: bool,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    pub fn incr(&mut self, value: Value) {
        self.aggregated = false;
        self.total += 1;
        match self.counters.iter_mut().find(|c| equal(&c.value, &value)) {
            Some(counter) => counter.count += 1,
            None => {
                let mut counter = Counter::new(value);
                counter.count = 1;
                self.counters.push(counter);
            }
        }
    }

    pub fn aggregate(&mut self) {
        if self.aggregated {
            return;
        }
        self.counters.sort_by(|a, b| compare(&a.value, &b.value));
        let total = self.total as f64;
        let mut before = 0u64;
        for counter in &mut self.counters {
            counter.at_least = self.total - before;
            before += counter.count;
            counter.at_most = before;
            if self.total > 0 {
                counter.relative = counter.count as f64 / total;
                counter.relative_at_most = counter.at_most as f64 / total;
                counter.relative_at_least = counter.at_least as f64 / total;
            }
        }
        self.aggregated = true;
    }

    pub fn mean(&mut self) -> f64 {
        self.aggregate();
        self.counters
            .iter()
            .map(|c| number_view(&c.value) as f64 * c.relative)
            .sum()
    }

    /// Sum of the squared weighted deviations.
    pub fn stddev(&mut self) -> f64 {
        let mean = self.mean();
        self.counters
            .iter()
            .map(|c| {
                let deviation = (number_view(&c.value) as f64 - mean) * c.relative;
                deviation * deviation
            })
            .sum()
    }

    /// Most frequent value, the first one on ties.
    pub fn mode(&mut self) -> Option<&Value> {
        self.aggregate();
        let mut best: Option<&Counter> = None;
        for counter in &self.counters {
            if best.map_or(true, |b| counter.count > b.count) {
                best = Some(counter);
            }
        }
        best.map(|c| &c.value)
    }

    pub fn median_inf(&mut self) -> Option<Value> {
        self.aggregate();
        self.counters
            .iter()
            .find(|c| c.relative_at_most >= 0.5)
            .or_else(|| self.counters.iter().rev().find(|c| c.relative_at_least >= 0.5))
            .or_else(|| self.counters.last())
            .map(|c| c.value.clone())
    }

    pub fn median_sup(&mut self) -> Option<Value> {
        self.aggregate();
        self.counters
            .iter()
            .rev()
            .find(|c| c.relative_at_least >= 0.5)
            .or_else(|| self.counters.iter().find(|c| c.relative_at_most >= 0.5))
            .or_else(|| self.counters.first())
            .map(|c| c.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution(values: &[i64]) -> Distribution {
        let mut distribution = Distribution::new();
        for value in values {
            distribution.incr(Value::Number(*value));
        }
        distribution
    }

    #[test]
    fn aggregate_fills_cumulative_counts() {
        let mut d = distribution(&[3, 1, 3, 2, 3]);
        d.aggregate();
        let values: Vec<_> = d.counters().iter().map(|c| c.value.clone()).collect();
        assert_eq!(values, vec![Value::Number(1), Value::Number(2), Value::Number(3)]);
        let counts: Vec<_> = d.counters().iter().map(|c| (c.count, c.at_most, c.at_least)).collect();
        assert_eq!(counts, vec![(1, 1, 5), (1, 2, 4), (3, 5, 3)]);
        assert!((d.counters()[2].relative - 0.6).abs() < 1e-9);
    }

    #[test]
    fn aggregate_is_idempotent_until_the_next_increment() {
        let mut d = distribution(&[2, 1]);
        d.aggregate();
        let first: Vec<_> = d.counters().iter().map(|c| c.at_most).collect();
        d.aggregate();
        let second: Vec<_> = d.counters().iter().map(|c| c.at_most).collect();
        assert_eq!(first, second);
        d.incr(Value::Number(0));
        assert!(!d.is_aggregated());
    }

    #[test]
    fn statistics_of_a_small_sample() {
        let mut d = distribution(&[1, 2, 2, 3]);
        assert!((d.mean() - 2.0).abs() < 1e-9);
        assert_eq!(d.mode(), Some(&Value::Number(2)));
        assert_eq!(d.median_inf(), Some(Value::Number(2)));
        assert_eq!(d.median_sup(), Some(Value::Number(2)));
        // (-1 * 0.25)^2 + 0 + (1 * 0.25)^2
        assert!((d.stddev() - 0.125).abs() < 1e-9);
    }

    #[test]
    fn mode_ties_go_to_the_smallest_value() {
        let mut d = distribution(&[5, 5, 2, 2, 9]);
        assert!(!d.is_aggregated());
        assert_eq!(d.mode(), Some(&Value::Number(2)));
        assert!(d.is_aggregated());
    }

    #[test]
    fn medians_split_an_even_sample() {
        let mut d = distribution(&[1, 2]);
        assert_eq!(d.median_inf(), Some(Value::Number(1)));
        assert_eq!(d.median_sup(), Some(Value::Number(2)));
    }

    #[test]
    fn empty_distribution_has_no_statistics() {
        let mut d = Distribution::new();
        assert_eq!(d.mode(), None);
        assert_eq!(d.median_inf(), None);
        assert_eq!(d.median_sup(), None);
        assert_eq!(d.mean(), 0.0);
    }
}
