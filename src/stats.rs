//! Summary statistics gathered over a data set, used to configure encoders.

use crate::error::{Error, Result};

use std::collections::BTreeMap;

/// Running mean, variance and range of a stream of values.
#[derive(Clone, Debug, Default)]
pub struct ScalarStatistics {
    count: usize,
    mean: f64,
    // sum of squared distances from the running mean
    m2: f64,
    min: f64,
    max: f64,
}

impl ScalarStatistics {
    pub fn new() -> Self {
        ScalarStatistics::default()
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut stats = ScalarStatistics::new();
        for v in values {
            stats.observe(v);
        }
        stats
    }

    pub fn observe(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn check_observed(&self) -> Result<()> {
        if self.count == 0 {
            return Err(Error::NoObservations);
        }
        Ok(())
    }

    pub fn mean(&self) -> Result<f64> {
        self.check_observed()?;
        Ok(self.mean)
    }

    /// Sample variance, `m2 / (count - 1)`. Needs at least two values.
    pub fn variance(&self) -> Result<f64> {
        if self.count < 2 {
            return Err(Error::NoObservations);
        }
        Ok(self.m2 / (self.count - 1) as f64)
    }

    pub fn std_dev(&self) -> Result<f64> {
        Ok(self.variance()?.sqrt())
    }

    pub fn min(&self) -> Result<f64> {
        self.check_observed()?;
        Ok(self.min)
    }

    pub fn max(&self) -> Result<f64> {
        self.check_observed()?;
        Ok(self.max)
    }
}

/// Frequencies of the distinct values in a stream. Categories keep the order
/// in which they were first seen.
#[derive(Clone, Debug)]
pub struct CategoryStatistics<C> {
    ids: BTreeMap<C, usize>,
    categories: Vec<C>,
    counts: Vec<usize>,
    total: usize,
}

impl<C> Default for CategoryStatistics<C> {
    fn default() -> Self {
        CategoryStatistics {
            ids: BTreeMap::new(),
            categories: Vec::new(),
            counts: Vec::new(),
            total: 0,
        }
    }
}

impl<C> CategoryStatistics<C>
where
    C: Ord + Clone,
{
    pub fn new() -> Self {
        CategoryStatistics::default()
    }

    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let mut stats = CategoryStatistics::new();
        for v in values {
            stats.observe(v);
        }
        stats
    }

    pub fn observe(&mut self, value: C) {
        self.total += 1;
        if let Some(&id) = self.ids.get(&value) {
            self.counts[id] += 1;
            return;
        }
        self.ids.insert(value.clone(), self.categories.len());
        self.categories.push(value);
        self.counts.push(1);
    }

    /// Total number of observations.
    pub fn count(&self) -> usize {
        self.total
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> Vec<C> {
        self.categories.clone()
    }

    pub fn frequency(&self, value: &C) -> usize {
        self.ids.get(value).map_or(0, |&id| self.counts[id])
    }

    pub fn probability(&self, value: &C) -> Result<f64> {
        if self.total == 0 {
            return Err(Error::NoObservations);
        }
        Ok(self.frequency(value) as f64 / self.total as f64)
    }

    /// The most frequent category; ties go to the one seen first.
    pub fn mode(&self) -> Result<&C> {
        let mut best: Option<usize> = None;
        for (id, &count) in self.counts.iter().enumerate() {
            if best.map_or(true, |b| count > self.counts[b]) {
                best = Some(id);
            }
        }
        best.map(|id| &self.categories[id])
            .ok_or(Error::NoObservations)
    }
}
