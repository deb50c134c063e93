use std::fmt;

use serde::Serialize;

use crate::math::curve::nonparametriccurve::nonparametriccurve::{
    NonparametricCurve,
    Point2D
};
use crate::math::statistics::{
    abs_diff,
    median,
    not_close_to_zero
};
use crate::readererror::{
    ReaderError,
    Result
};

/// 常數區間 [start, end) 與其代表值（區間內原始樣本的中位數）。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    start: f64,
    end: f64,
    value: f64
}

impl Interval {
    pub fn new(start: f64, end: f64, value: f64) -> Interval {
        Interval { start, end, value }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

// ─────────────────────────────────────────────
// PiecewiseConstant（零階樣條）
// ─────────────────────────────────────────────
//
// 切割規則：
//   d[0] = NaN，d[i] = |p[i] - p[i-1]|，p 為去噪並正規化後的序列；
//   d[i] 為 NaN 或 > tolerance 的位置即為區間左端點。
//   NaN 必然出現在 index 0，因此第一個區間一定從 t[0] 開始。
//
// 區間邊界：
//   第 k 段涵蓋樣本 index [c_k, c_{k+1})，最後一段為 [c_last, N-1]（右閉）。
//   中位數與查詢使用同一條規則：恰好落在右端點的時間屬於下一段，
//   只有 t[N-1] 屬於最後一段。

/// 由取樣序列擬合出的分段常數函數。
#[derive(Debug, Clone)]
pub struct PiecewiseConstant {
    name: String,
    intervals: Vec<Interval>,
    right_times: Vec<f64>
}

impl PiecewiseConstant {
    /// `values` 為原始樣本，`processed` 為同 index 的去噪正規化序列，
    /// 只用來決定切割點。
    pub fn fit(
        name: &str,
        times: &[f64],
        values: &[f64],
        processed: &[f64],
        tolerance: f64,
    ) -> Result<PiecewiseConstant> {
        let n = times.len();
        if n < 2 {
            return Err(ReaderError::invalid_input(format!(
                "'{}': step interpolation needs at least 2 samples, got {}",
                name, n
            )));
        }
        if values.len() != n || processed.len() != n {
            return Err(ReaderError::invalid_input(format!(
                "'{}': {} times, {} values and {} processed values",
                name,
                n,
                values.len(),
                processed.len()
            )));
        }
        if times.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(ReaderError::invalid_input(format!(
                "'{}': times must be strictly increasing",
                name
            )));
        }

        let cut_indices: Vec<usize> = abs_diff(processed)
            .into_iter()
            .enumerate()
            .filter(|&(_, d)| not_close_to_zero(d, tolerance))
            .map(|(i, _)| i)
            .collect();

        let intervals: Vec<Interval> = cut_indices
            .iter()
            .enumerate()
            .map(|(k, &lhs)| {
                let (end, rhs) = match cut_indices.get(k + 1) {
                    Some(&next) => (times[next], next),
                    None => (times[n - 1], n),
                };
                // 每段至少包含左端點的樣本，中位數必然存在
                let value = median(&values[lhs..rhs]).unwrap_or(f64::NAN);
                Interval::new(times[lhs], end, value)
            })
            .collect();
        let right_times = intervals.iter().map(|iv| iv.end).collect();

        Ok(PiecewiseConstant {
            name: name.to_owned(),
            intervals,
            right_times
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// 單點查詢：以右端點做 upper-bound 二分搜尋，O(log K)。
    pub fn value(&self, t: f64) -> Result<f64> {
        let (min, max) = (self.min_x(), self.max_x());
        if !(t >= min && t <= max) {
            return Err(ReaderError::OutOfDomain { time: t, min, max });
        }
        let index = self
            .right_times
            .partition_point(|&rhs| rhs <= t)
            .min(self.intervals.len() - 1);
        Ok(self.intervals[index].value)
    }

    /// 批次查詢，遇到第一個超出定義域的時間即回傳錯誤。
    pub fn evaluate(&self, times: &[f64]) -> Result<Vec<f64>> {
        times.iter().map(|&t| self.value(t)).collect()
    }

    /// LaTeX `cases` 表示式。
    pub fn to_latex(&self) -> String {
        let mut lines = Vec::with_capacity(self.intervals.len() + 2);
        lines.push(format!(r"{}(t) \approx \begin{{cases}}", self.name));
        let last = self.intervals.len().saturating_sub(1);
        for (i, iv) in self.intervals.iter().enumerate() {
            // 最後一段包含終點
            let close = if i == last { ']' } else { ')' };
            lines.push(format!(
                r"{} &\text{{ if }} t\in [{}, {}{} \\",
                iv.value, iv.start, iv.end, close
            ));
        }
        lines.push(r"\end{cases}".to_owned());
        lines.join("\n")
    }
}

impl fmt::Display for PiecewiseConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_latex())
    }
}

impl NonparametricCurve for PiecewiseConstant {
    fn points(&self) -> Vec<Point2D> {
        let mut pts: Vec<Point2D> = self
            .intervals
            .iter()
            .map(|iv| Point2D::new(iv.start, iv.value))
            .collect();
        if let Some(last) = self.intervals.last() {
            pts.push(Point2D::new(last.end, last.value));
        }
        pts
    }

    fn min_x(&self) -> f64 {
        self.intervals[0].start
    }

    fn max_x(&self) -> f64 {
        self.right_times[self.right_times.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::statistics::min_max_normalize;

    fn fit(times: &[f64], values: &[f64]) -> PiecewiseConstant {
        let processed = min_max_normalize(values);
        PiecewiseConstant::fit("u", times, values, &processed, 1e-8).unwrap()
    }

    #[test]
    fn single_jump_gives_two_intervals() {
        let step = fit(&[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0, 1.0, 1.0, 5.0, 5.0]);
        assert_eq!(
            step.intervals(),
            &[Interval::new(0.0, 3.0, 1.0), Interval::new(3.0, 4.0, 5.0)]
        );
        assert_eq!(step.value(3.0).unwrap(), 5.0);
        assert_eq!(step.value(2.9).unwrap(), 1.0);
        assert_eq!(step.value(4.0).unwrap(), 5.0);
        assert!(matches!(step.value(5.0), Err(ReaderError::OutOfDomain { .. })));
    }

    #[test]
    fn query_before_start_or_nan_is_out_of_domain() {
        let step = fit(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(step.value(-0.1), Err(ReaderError::OutOfDomain { .. })));
        assert!(matches!(step.value(f64::NAN), Err(ReaderError::OutOfDomain { .. })));
    }

    #[test]
    fn constant_series_is_one_interval() {
        let step = fit(&[0.0, 0.5, 1.0], &[2.0, 2.0, 2.0]);
        assert_eq!(step.intervals(), &[Interval::new(0.0, 1.0, 2.0)]);
    }

    #[test]
    fn intervals_cover_the_whole_span() {
        let times = [0.0, 0.1, 0.3, 0.4, 0.8, 1.0, 1.1];
        let values = [0.0, 0.0, 2.0, 2.0, -1.0, 3.0, 3.0];
        let step = fit(&times, &values);
        let ivs = step.intervals();
        assert_eq!(ivs[0].start(), times[0]);
        assert_eq!(ivs[ivs.len() - 1].end(), times[times.len() - 1]);
        for w in ivs.windows(2) {
            assert_eq!(w[0].end(), w[1].start());
        }
    }

    #[test]
    fn left_edges_return_their_interval_value() {
        let times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let values = [1.0, 1.0, 4.0, 4.0, 2.0, 7.0];
        let step = fit(&times, &values);
        for iv in step.intervals() {
            assert_eq!(step.value(iv.start()).unwrap(), iv.value());
            assert_eq!(step.value(iv.start()).unwrap(), step.value(iv.start()).unwrap());
        }
    }

    #[test]
    fn jump_on_last_sample_gives_degenerate_last_interval() {
        let step = fit(&[0.0, 1.0, 2.0], &[1.0, 1.0, 3.0]);
        assert_eq!(
            step.intervals(),
            &[Interval::new(0.0, 2.0, 1.0), Interval::new(2.0, 2.0, 3.0)]
        );
        assert_eq!(step.value(1.999).unwrap(), 1.0);
        assert_eq!(step.value(2.0).unwrap(), 3.0);
        assert!(step.to_latex().contains(r"3 &\text{ if } t\in [2, 2] \\"));
    }

    #[test]
    fn median_uses_half_open_intervals() {
        // [0, 2) 只含 index 0、1，不含右端點 t=2 的樣本
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [1.0, 1.0, 10.0, 10.0];
        let processed = [0.0, 0.0, 1.0, 1.0];
        let step = PiecewiseConstant::fit("x", &times, &values, &processed, 1e-8).unwrap();
        assert_eq!(step.intervals()[0].value(), 1.0);
        assert_eq!(step.intervals()[1].value(), 10.0);
    }

    #[test]
    fn small_changes_below_tolerance_are_merged() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let values = [1.0, 1.1, 0.9, 1.0];
        let processed = [0.5, 0.5 + 1e-10, 0.5, 0.5];
        let step = PiecewiseConstant::fit("x", &times, &values, &processed, 1e-8).unwrap();
        assert_eq!(step.intervals().len(), 1);
        assert!((step.intervals()[0].value() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_short_or_mismatched_input() {
        assert!(matches!(
            PiecewiseConstant::fit("x", &[0.0], &[1.0], &[0.0], 1e-8),
            Err(ReaderError::InvalidInput(_))
        ));
        assert!(matches!(
            PiecewiseConstant::fit("x", &[0.0, 1.0], &[1.0, 2.0], &[0.0], 1e-8),
            Err(ReaderError::InvalidInput(_))
        ));
    }

    #[test]
    fn renders_latex_cases() {
        let step = fit(&[0.0, 1.0, 2.0, 3.0, 4.0], &[1.0, 1.0, 1.0, 5.0, 5.0]);
        let expected = "u(t) \\approx \\begin{cases}\n\
                        1 &\\text{ if } t\\in [0, 3) \\\\\n\
                        5 &\\text{ if } t\\in [3, 4] \\\\\n\
                        \\end{cases}";
        assert_eq!(step.to_latex(), expected);
        assert_eq!(step.to_string(), expected);
    }
}
