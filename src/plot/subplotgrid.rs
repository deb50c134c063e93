use serde::Serialize;

use crate::readererror::{
    ReaderError,
    Result
};
use crate::solution::variable::Variable;

/// 單一變數隨時間變化的折線圖資料。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePlot {
    x_label: String,
    y_label: String,
    x: Vec<f64>,
    y: Vec<f64>
}

impl LinePlot {
    pub fn from_variable(variable: &Variable) -> LinePlot {
        LinePlot {
            x_label: "time".to_owned(),
            y_label: variable.name().to_owned(),
            x: variable.times().to_vec(),
            y: variable.values().to_vec()
        }
    }

    pub fn x_label(&self) -> &str {
        &self.x_label
    }

    pub fn y_label(&self) -> &str {
        &self.y_label
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }
}

/// n_rows × n_cols 的子圖排版，每格一個變數，依列優先填入。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubplotGrid {
    title: String,
    n_rows: usize,
    n_cols: usize,
    cells: Vec<LinePlot>
}

impl SubplotGrid {
    /// `n_cols` 或 `n_rows` 為 0 時改為單欄、每個變數一列；
    /// 格數與變數數不符回傳 `ShapeMismatch`。
    pub fn new(title: &str, n_cols: usize, n_rows: usize, variables: &[&Variable]) -> Result<SubplotGrid> {
        let (n_cols, n_rows) = if n_cols == 0 || n_rows == 0 {
            (1, variables.len())
        } else {
            (n_cols, n_rows)
        };
        if n_cols * n_rows != variables.len() {
            return Err(ReaderError::ShapeMismatch {
                n_cols,
                n_rows,
                expected: variables.len()
            });
        }
        Ok(SubplotGrid {
            title: title.to_owned(),
            n_rows,
            n_cols,
            cells: variables.iter().map(|v| LinePlot::from_variable(v)).collect()
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// (列數, 欄數)
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    pub fn cells(&self) -> &[LinePlot] {
        &self.cells
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&LinePlot> {
        if row < self.n_rows && col < self.n_cols {
            self.cells.get(row * self.n_cols + col)
        } else {
            None
        }
    }

    /// 每個子圖維持 `base` 大小時整張圖的 (寬, 高)。
    pub fn figure_size(&self, base: (f64, f64)) -> (f64, f64) {
        (base.0 * self.n_cols as f64, base.1 * self.n_rows as f64)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
