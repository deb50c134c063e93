use crate::math::curve::nonparametriccurve::nonparametriccurve::Point2D;
use crate::readererror::{
    ReaderError,
    Result
};

/// 時間嚴格遞增、至少兩點的 (time, value) 序列。建構後不可變。
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSeries {
    times: Vec<f64>,
    values: Vec<f64>
}

impl SampledSeries {
    pub fn new(name: &str, times: Vec<f64>, values: Vec<f64>) -> Result<SampledSeries> {
        if times.len() != values.len() {
            return Err(ReaderError::invalid_input(format!(
                "'{}': {} times for {} values",
                name,
                times.len(),
                values.len()
            )));
        }
        if times.len() < 2 {
            return Err(ReaderError::invalid_input(format!(
                "'{}': a series needs at least 2 samples, got {}",
                name,
                times.len()
            )));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(ReaderError::invalid_input(format!("'{}': times must be finite", name)));
        }
        if times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ReaderError::invalid_input(format!(
                "'{}': times must be strictly increasing",
                name
            )));
        }
        Ok(SampledSeries { times, values })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first_time(&self) -> f64 {
        self.times[0]
    }

    pub fn last_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn points(&self) -> Vec<Point2D> {
        self.times
            .iter()
            .zip(self.values.iter())
            .map(|(&t, &v)| Point2D::new(t, v))
            .collect()
    }

    /// 樣本值與 `value` 差距最小的時間；平手取最早者，NaN 樣本略過。
    pub fn nearest_time(&self, value: f64) -> Option<f64> {
        self.times
            .iter()
            .zip(self.values.iter())
            .filter(|(_, v)| !v.is_nan())
            .map(|(&t, &v)| (t, (v - value).abs()))
            .fold(None, |best: Option<(f64, f64)>, (t, dist)| match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((t, dist)),
            })
            .map(|(t, _)| t)
    }

    /// 值域（略過 NaN）
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| !v.is_nan())
            .fold(None, |range, &v| match range {
                None => Some((v, v)),
                Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            })
    }
}
