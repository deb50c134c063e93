use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::math::curve::curveinverter::InversionSettings;
use crate::math::curve::nonparametriccurve::piecewisepolynomial::PolynomialType;
use crate::readererror::{
    ReaderError,
    Result
};

/// 載入解目錄時的設定，可由 JSON 檔讀入，未給的欄位採預設值。
///
/// ```json
/// {
///     "require_adjoints": true,
///     "declared_states": ["biomass"],
///     "spline": "not_a_knot_cubic",
///     "median_filter_size": 1,
///     "cut_tolerance": 1e-8,
///     "inversion": { "value_tolerance": 1e-8, "max_iters": 100 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// 每個 state 都必須找到 `<name>_adjoint_state`，否則載入失敗
    require_adjoints: bool,
    /// 即使沒有 adjoint 檔案也視為 state 的變數名稱
    declared_states: Vec<String>,
    spline: PolynomialType,
    median_filter_size: usize,
    cut_tolerance: f64,
    inversion: InversionSettings
}

impl Default for Configuration {
    fn default() -> Configuration {
        Configuration {
            require_adjoints: true,
            declared_states: Vec::new(),
            spline: PolynomialType::NotAKnotCubic,
            median_filter_size: 1,
            cut_tolerance: 1e-8,
            inversion: InversionSettings::default()
        }
    }
}

impl Configuration {
    pub fn new() -> Configuration {
        Configuration::default()
    }

    pub fn from_reader(file_path: impl AsRef<Path>) -> Result<Configuration> {
        let file = File::open(file_path)?;
        let reader = BufReader::new(file);
        let configuration: Configuration = serde_json::from_reader(reader)?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn from_json_str(json: &str) -> Result<Configuration> {
        let configuration: Configuration = serde_json::from_str(json)?;
        configuration.validate()?;
        Ok(configuration)
    }

    fn validate(&self) -> Result<()> {
        if self.median_filter_size == 0 {
            return Err(ReaderError::invalid_input("median_filter_size must be at least 1"));
        }
        if !(self.cut_tolerance >= 0.0) {
            return Err(ReaderError::invalid_input("cut_tolerance must be non-negative"));
        }
        Ok(())
    }

    pub fn require_adjoints(&self) -> bool {
        self.require_adjoints
    }

    pub fn declared_states(&self) -> &[String] {
        &self.declared_states
    }

    pub fn spline(&self) -> PolynomialType {
        self.spline
    }

    pub fn median_filter_size(&self) -> usize {
        self.median_filter_size
    }

    pub fn cut_tolerance(&self) -> f64 {
        self.cut_tolerance
    }

    pub fn inversion(&self) -> InversionSettings {
        self.inversion
    }

    pub fn with_require_adjoints(mut self, require_adjoints: bool) -> Configuration {
        self.require_adjoints = require_adjoints;
        self
    }

    pub fn with_declared_states(mut self, declared_states: Vec<String>) -> Configuration {
        self.declared_states = declared_states;
        self
    }

    pub fn with_spline(mut self, spline: PolynomialType) -> Configuration {
        self.spline = spline;
        self
    }

    /// 與 JSON 載入相同的檢查：視窗大小至少為 1。
    pub fn with_median_filter_size(mut self, size: usize) -> Result<Configuration> {
        self.median_filter_size = size;
        self.validate()?;
        Ok(self)
    }
}
