use serde::Serialize;

use crate::math::curve::nonparametriccurve::nonparametriccurve::Point2D;
use crate::readererror::{
    ReaderError,
    Result
};
use crate::solution::variable::Variable;

/// 相圖中相鄰兩個取樣點之間的線段，`color` 為起點時間正規化到 [0, 1]。
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseSegment {
    start: Point2D,
    end: Point2D,
    time: f64,
    color: f64
}

impl PhaseSegment {
    pub fn start(&self) -> Point2D {
        self.start
    }

    pub fn end(&self) -> Point2D {
        self.end
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn color(&self) -> f64 {
        self.color
    }
}

/// 兩個變數的相空間軌跡，以時間著色。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasePortrait {
    x_label: String,
    y_label: String,
    color_label: String,
    segments: Vec<PhaseSegment>,
    x_limits: (f64, f64),
    y_limits: (f64, f64),
    time_limits: (f64, f64)
}

impl PhasePortrait {
    pub fn new(x: &Variable, y: &Variable) -> Result<PhasePortrait> {
        if x.values().len() != y.values().len() {
            return Err(ReaderError::invalid_input(format!(
                "phase portrait of '{}' ({} samples) against '{}' ({} samples)",
                x.name(),
                x.values().len(),
                y.name(),
                y.values().len()
            )));
        }
        let times = x.times();
        let (t0, t1) = (x.series().first_time(), x.series().last_time());
        let span = t1 - t0;

        let points: Vec<Point2D> = x
            .values()
            .iter()
            .zip(y.values().iter())
            .map(|(&a, &b)| Point2D::new(a, b))
            .collect();
        let segments = points
            .windows(2)
            .zip(times.iter())
            .map(|(pair, &t)| PhaseSegment {
                start: pair[0],
                end: pair[1],
                time: t,
                color: (t - t0) / span
            })
            .collect();

        let missing = || ReaderError::invalid_input("phase portrait needs finite values");
        Ok(PhasePortrait {
            x_label: x.name().to_owned(),
            y_label: y.name().to_owned(),
            color_label: "time".to_owned(),
            segments,
            x_limits: x.series().value_range().ok_or_else(missing)?,
            y_limits: y.series().value_range().ok_or_else(missing)?,
            time_limits: (t0, t1)
        })
    }

    pub fn x_label(&self) -> &str {
        &self.x_label
    }

    pub fn y_label(&self) -> &str {
        &self.y_label
    }

    pub fn color_label(&self) -> &str {
        &self.color_label
    }

    pub fn segments(&self) -> &[PhaseSegment] {
        &self.segments
    }

    pub fn x_limits(&self) -> (f64, f64) {
        self.x_limits
    }

    pub fn y_limits(&self) -> (f64, f64) {
        self.y_limits
    }

    pub fn time_limits(&self) -> (f64, f64) {
        self.time_limits
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
