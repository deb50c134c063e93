use argmin::core::{
    CostFunction,
    Error,
    Executor,
    State
};
use argmin::solver::brent::BrentRoot;
use serde::Deserialize;

use crate::math::curve::curve::Curve;
use crate::readererror::{
    ReaderError,
    Result
};

// ─────────────────────────────────────────────
// CurveInverter
// ─────────────────────────────────────────────
//
// 求 t 使 f(t) = v。每個目標值各自求解（純量 root finding）：
//   1. 搜尋範圍由呼叫端切成曲線在其上單調的小區間（節點與極值點），
//      每個小區間內至多一個根，兩端變號即有根；
//   2. 依與猜測 g 的距離由近而遠檢查小區間，在變號者內以 Brent 法求根，
//      直到剩下的小區間不可能有更近的根為止。
// 定義域內的根優先；定義域內無根時才考慮外插區。
// 任何一個分量找不到根或未收斂，整次呼叫回傳 InversionFailed。
// 非單射時結果取決於猜測值：回傳的是離猜測最近的根。

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct InversionSettings {
    /// |f(t) - v| 的可接受誤差
    pub value_tolerance: f64,
    /// Brent 法在 t 上的收斂容差
    pub time_tolerance: f64,
    pub max_iters: u64,
    /// 定義域兩側各延伸幾個定義域寬度搜尋外插的根
    pub extrapolation_widths: f64
}

impl Default for InversionSettings {
    fn default() -> InversionSettings {
        InversionSettings {
            value_tolerance: 1e-8,
            time_tolerance: 1e-12,
            max_iters: 100,
            extrapolation_widths: 1.0
        }
    }
}

impl InversionSettings {
    /// 含外插區的搜尋範圍
    pub fn search_range(&self, min_x: f64, max_x: f64) -> (f64, f64) {
        let margin = self.extrapolation_widths.max(0.0) * (max_x - min_x);
        (min_x - margin, max_x + margin)
    }
}

struct LevelCrossing<'a, C: Curve> {
    curve: &'a C,
    level: f64
}

impl<C: Curve> CostFunction for LevelCrossing<'_, C> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, t: &Self::Param) -> std::result::Result<Self::Output, Error> {
        Ok(self.curve.value(*t) - self.level)
    }
}

impl<C: Curve> LevelCrossing<'_, C> {
    fn residual(&self, t: f64) -> f64 {
        self.curve.value(t) - self.level
    }
}

/// 曲線在其上單調的小區間
#[derive(Debug, Clone, Copy)]
struct MonotoneCell {
    lo: f64,
    hi: f64,
    in_domain: bool
}

impl MonotoneCell {
    fn distance_to(&self, t: f64) -> f64 {
        if t < self.lo {
            self.lo - t
        } else if t > self.hi {
            t - self.hi
        } else {
            0.0
        }
    }
}

pub struct CurveInverter<'a, C: Curve> {
    curve: &'a C,
    cells: Vec<MonotoneCell>,
    settings: InversionSettings
}

impl<'a, C: Curve> CurveInverter<'a, C> {
    /// `breakpoints` 把搜尋範圍切成 `curve` 在其上單調的小區間，須遞增且有限；
    /// `[min_x, max_x]` 為定義域，其端點會自動加入切點。
    pub fn new(
        curve: &'a C,
        min_x: f64,
        max_x: f64,
        breakpoints: &[f64],
        settings: InversionSettings,
    ) -> Result<CurveInverter<'a, C>> {
        if !(max_x > min_x) || !min_x.is_finite() || !max_x.is_finite() {
            return Err(ReaderError::invalid_input(format!(
                "invalid inversion domain [{}, {}]",
                min_x, max_x
            )));
        }
        if breakpoints.iter().any(|x| !x.is_finite())
            || breakpoints.windows(2).any(|w| w[1] <= w[0])
        {
            return Err(ReaderError::invalid_input(
                "inversion breakpoints must be finite and strictly increasing",
            ));
        }

        let mut cuts: Vec<f64> = breakpoints.to_vec();
        cuts.extend([min_x, max_x]);
        cuts.sort_by(f64::total_cmp);
        cuts.dedup();
        let cells = cuts
            .windows(2)
            .map(|w| MonotoneCell { lo: w[0], hi: w[1], in_domain: w[0] >= min_x && w[1] <= max_x })
            .collect();
        Ok(CurveInverter { curve, cells, settings })
    }

    /// 對每個 (目標值, 猜測) 求解，順序與輸入一致。
    pub fn invert(&self, levels: &[f64], guesses: &[f64]) -> Result<Vec<f64>> {
        if levels.len() != guesses.len() {
            return Err(ReaderError::invalid_input(format!(
                "{} values but {} guesses",
                levels.len(),
                guesses.len()
            )));
        }
        levels
            .iter()
            .zip(guesses.iter())
            .enumerate()
            .map(|(i, (&level, &guess))| {
                self.invert_one(level, guess).map_err(|err| {
                    ReaderError::InversionFailed(format!("component {} (value {}): {}", i, level, err))
                })
            })
            .collect()
    }

    fn invert_one(&self, level: f64, guess: f64) -> std::result::Result<f64, String> {
        if !level.is_finite() || !guess.is_finite() {
            return Err("value and guess must be finite".to_owned());
        }
        let problem = LevelCrossing { curve: self.curve, level };
        if problem.residual(guess).abs() <= self.settings.value_tolerance {
            return Ok(guess);
        }

        for in_domain in [true, false] {
            let mut cells: Vec<&MonotoneCell> =
                self.cells.iter().filter(|cell| cell.in_domain == in_domain).collect();
            cells.sort_by(|a, b| a.distance_to(guess).total_cmp(&b.distance_to(guess)));

            let mut best: Option<f64> = None;
            for cell in cells {
                if let Some(root) = best {
                    if cell.distance_to(guess) >= (root - guess).abs() {
                        break;
                    }
                }
                if let Some(root) = self.solve_cell(&problem, cell, guess)? {
                    if best.map_or(true, |b| (root - guess).abs() < (b - guess).abs()) {
                        best = Some(root);
                    }
                }
            }
            if let Some(root) = best {
                return Ok(root);
            }
        }
        Err(format!("value {} is not reached near {}", level, guess))
    }

    /// 單調小區間內的根；兩端同號時回傳 `None`。
    fn solve_cell(
        &self,
        problem: &LevelCrossing<'_, C>,
        cell: &MonotoneCell,
        guess: f64,
    ) -> std::result::Result<Option<f64>, String> {
        let tolerance = self.settings.value_tolerance;
        let (f_lo, f_hi) = (problem.residual(cell.lo), problem.residual(cell.hi));

        // 極值恰好等於目標值時，根落在切點上
        let touching = [(cell.lo, f_lo), (cell.hi, f_hi)]
            .into_iter()
            .filter(|(_, f)| f.abs() <= tolerance)
            .map(|(t, _)| t)
            .min_by(|a, b| (a - guess).abs().total_cmp(&(b - guess).abs()));
        if touching.is_some() {
            return Ok(touching);
        }
        if f_lo.signum() == f_hi.signum() {
            return Ok(None);
        }

        let solver = BrentRoot::new(cell.lo, cell.hi, self.settings.time_tolerance);
        let max_iters = self.settings.max_iters;
        let start = cell.hi;
        let result = Executor::new(LevelCrossing { curve: problem.curve, level: problem.level }, solver)
            .configure(|state| state.param(start).max_iters(max_iters))
            .run()
            .map_err(|err| err.to_string())?;

        let root = result
            .state()
            .get_param()
            .copied()
            .ok_or_else(|| "solver returned no parameter".to_owned())?;
        let residual = problem.residual(root);
        if residual.abs() > tolerance {
            return Err(format!("did not converge, residual {} at t = {}", residual, root));
        }
        Ok(Some(root))
    }
}
