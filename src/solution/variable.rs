use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::configuration::Configuration;
use crate::math::curve::curve::Curve;
use crate::math::curve::curveinverter::{
    CurveInverter,
    InversionSettings
};
use crate::math::curve::nonparametriccurve::piecewiseconstant::PiecewiseConstant;
use crate::math::curve::nonparametriccurve::piecewisepolynomial::PiecewisePolynomial;
use crate::math::statistics::{
    median_filter,
    min_max_normalize
};
use crate::readererror::{
    ReaderError,
    Result
};
use crate::solution::sampledseries::SampledSeries;

pub const ADJOINT_SUFFIX: &str = "_adjoint_state";
pub const STAGE_PREFIX: &str = "stage_";

/// state `X` 對應的 adjoint 變數名稱 `X_adjoint_state`。
pub fn adjoint_name(state_name: &str) -> String {
    format!("{}{}", state_name, ADJOINT_SUFFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VariableKind {
    State,
    AdjointState,
    Control
}

impl VariableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableKind::State => "State",
            VariableKind::AdjointState => "AdjointState",
            VariableKind::Control => "Control"
        }
    }

    /// bunch 的標題（複數形），也用作圖表標題。
    pub fn bunch_title(&self) -> &'static str {
        match self {
            VariableKind::State => "States",
            VariableKind::AdjointState => "AdjointStates",
            VariableKind::Control => "Controls"
        }
    }

    /// 可以畫相圖的種類
    pub fn supports_phase_portrait(&self) -> bool {
        !matches!(self, VariableKind::Control)
    }
}

/// 一個 state、adjoint state 或 control 變數：取樣序列加上兩種插值。
///
/// state 只記錄 adjoint 的名稱，實際的 adjoint 由擁有它的
/// `BocopSolution` 查詢（見 `BocopSolution::adjoint_of`）。
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    series: SampledSeries,
    smooth_interpolator: PiecewisePolynomial,
    step_interpolator: PiecewiseConstant,
    inversion: InversionSettings,
    adjoint: Option<String>
}

impl Variable {
    pub fn new(
        name: &str,
        kind: VariableKind,
        series: SampledSeries,
        configuration: &Configuration,
    ) -> Result<Variable> {
        let filtered = median_filter(series.values(), configuration.median_filter_size());
        let processed = min_max_normalize(&filtered);
        let step_interpolator = PiecewiseConstant::fit(
            name,
            series.times(),
            series.values(),
            &processed,
            configuration.cut_tolerance(),
        )?;
        let smooth_interpolator = PiecewisePolynomial::new(configuration.spline(), series.points())?;
        debug!(
            variable = name,
            kind = kind.as_str(),
            samples = series.len(),
            intervals = step_interpolator.intervals().len(),
            "fitted interpolators"
        );

        Ok(Variable {
            name: name.to_owned(),
            kind,
            series,
            smooth_interpolator,
            step_interpolator,
            inversion: configuration.inversion(),
            adjoint: None
        })
    }

    pub(crate) fn link_adjoint(&mut self, adjoint: String) {
        self.adjoint = Some(adjoint);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn series(&self) -> &SampledSeries {
        &self.series
    }

    pub fn times(&self) -> &[f64] {
        self.series.times()
    }

    pub fn values(&self) -> &[f64] {
        self.series.values()
    }

    /// 已連結的 adjoint 名稱，只有 state 會有。
    pub fn adjoint_name(&self) -> Option<&str> {
        self.adjoint.as_deref()
    }

    pub fn smooth_interpolator(&self) -> &PiecewisePolynomial {
        &self.smooth_interpolator
    }

    pub fn step_interpolator(&self) -> &PiecewiseConstant {
        &self.step_interpolator
    }

    pub fn value(&self, t: f64) -> f64 {
        self.smooth_interpolator.value(t)
    }

    /// 三次樣條求值；定義域外沿用端點多項式外插。
    pub fn evaluate(&self, times: &[f64]) -> Vec<f64> {
        self.smooth_interpolator.values(times)
    }

    pub fn derivative(&self, t: f64) -> f64 {
        self.smooth_interpolator.derivative(t)
    }

    pub fn evaluate_steps(&self, times: &[f64]) -> Result<Vec<f64>> {
        self.step_interpolator.evaluate(times)
    }

    /// 求 `times` 使 `self.evaluate(times)` 接近 `values`。
    ///
    /// `guesses` 中為 `None`（或整個為 `None`）的分量，以樣本值最接近
    /// 目標值的取樣時間作為初始猜測。非單射時可用猜測指定要哪一個根。
    pub fn inverse(&self, values: &[f64], guesses: Option<&[Option<f64>]>) -> Result<Vec<f64>> {
        if let Some(guesses) = guesses {
            if guesses.len() != values.len() {
                return Err(ReaderError::invalid_input(format!(
                    "'{}': {} values but {} guesses",
                    self.name,
                    values.len(),
                    guesses.len()
                )));
            }
        }
        let initial: Vec<f64> = values
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                guesses
                    .and_then(|g| g[i])
                    .or_else(|| self.series.nearest_time(value))
                    .ok_or_else(|| {
                        ReaderError::InversionFailed(format!(
                            "'{}': no finite sample to seed value {}",
                            self.name, value
                        ))
                    })
            })
            .collect::<Result<_>>()?;

        let (first, last) = (self.series.first_time(), self.series.last_time());
        let (lo, hi) = self.inversion.search_range(first, last);
        let breakpoints = self.smooth_interpolator.monotone_breakpoints(lo, hi);
        let inverter = CurveInverter::new(
            &self.smooth_interpolator,
            first,
            last,
            &breakpoints,
            self.inversion,
        )?;
        inverter.invert(values, &initial)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.as_str(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(times: Vec<f64>, values: Vec<f64>) -> Variable {
        let series = SampledSeries::new("x", times, values).unwrap();
        Variable::new("x", VariableKind::State, series, &Configuration::new()).unwrap()
    }

    #[test]
    fn smooth_interpolation_is_exact_at_samples() {
        let times: Vec<f64> = (0..8).map(|i| i as f64 * 0.25).collect();
        let values: Vec<f64> = times.iter().map(|t| (3.0 * t).sin()).collect();
        let x = variable(times.clone(), values.clone());
        for (v, expected) in x.evaluate(&times).iter().zip(values.iter()) {
            assert!((v - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn inverse_round_trip_with_self_guess() {
        let times: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();
        let values: Vec<f64> = times.iter().map(|t| (4.0 * t).sin()).collect();
        let x = variable(times, values);
        let t = 0.33;
        let target = x.value(t);
        let found = x.inverse(&[target], Some(&[Some(t)])).unwrap();
        assert!((found[0] - t).abs() < 1e-6);
    }

    #[test]
    fn inverse_near_peak_stays_next_to_guess() {
        let times: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();
        let values: Vec<f64> = times.iter().map(|t| (3.0 * t).sin()).collect();
        let x = variable(times, values);
        // 兩個根約在 0.51 與 0.53，相距小於取樣間距
        let target = 0.999;
        let found = x.inverse(&[target], Some(&[Some(0.5)])).unwrap();
        assert!((0.5..=0.55).contains(&found[0]));
        assert!((x.value(found[0]) - target).abs() < 1e-8);

        let found = x.inverse(&[target], Some(&[Some(0.56)])).unwrap();
        assert!((0.5..=0.55).contains(&found[0]));
        assert!(found[0] > 0.5236);
    }

    #[test]
    fn inverse_of_spline_peak_value_returns_peak() {
        let times: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();
        let values: Vec<f64> = times.iter().map(|t| (3.0 * t).sin()).collect();
        let x = variable(times, values);
        let peak = x.smooth_interpolator().monotone_breakpoints(0.5, 0.6)[1];
        let found = x.inverse(&[x.value(peak)], Some(&[Some(0.5)])).unwrap();
        assert!((found[0] - peak).abs() < 1e-3);
        assert!((0.0..=1.0).contains(&found[0]));
    }

    #[test]
    fn inverse_defaults_to_nearest_sample_guess() {
        let times: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let values: Vec<f64> = times.iter().map(|t| 2.0 * t + 1.0).collect();
        let x = variable(times, values);
        let found = x.inverse(&[4.0, 8.5], None).unwrap();
        assert!((found[0] - 1.5).abs() < 1e-8);
        assert!((found[1] - 3.75).abs() < 1e-8);
    }

    #[test]
    fn inverse_guess_count_must_match() {
        let x = variable(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
        let err = x.inverse(&[0.5, 1.5], Some(&[None])).unwrap_err();
        assert!(matches!(err, ReaderError::InvalidInput(_)));
    }

    #[test]
    fn step_interpolator_uses_raw_values() {
        let x = variable(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, 1.0, 1.0, 5.0, 5.0],
        );
        assert_eq!(x.evaluate_steps(&[0.0, 2.9, 3.0, 4.0]).unwrap(), vec![1.0, 1.0, 5.0, 5.0]);
        assert!(x.evaluate_steps(&[5.0]).is_err());
        assert_eq!(x.to_string(), "State(x)");
        assert_eq!(adjoint_name("x"), "x_adjoint_state");
    }
}
