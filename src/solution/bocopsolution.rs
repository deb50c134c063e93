use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf
};

use tracing::{
    debug,
    info,
    warn
};

use crate::configuration::Configuration;
use crate::readererror::{
    ReaderError,
    Result
};
use crate::solution::exportfile::{
    read_export,
    ExportContent,
    NumericArray,
    EXPORT_EXTENSION
};
use crate::solution::sampledseries::SampledSeries;
use crate::solution::solutiontable::SolutionTable;
use crate::solution::variable::{
    adjoint_name,
    Variable,
    VariableKind,
    STAGE_PREFIX
};
use crate::solution::variablebunch::VariableBunch;

pub const DISCRETIZATION_TIMES: &str = "discretization_times";
pub const STAGE_TIMES: &str = "stage_times";
pub const PARAMETERS: &str = "parameters";

const CONSTANT_NAMES: [&str; 3] = [DISCRETIZATION_TIMES, STAGE_TIMES, PARAMETERS];

/// state 與其 adjoint 的借用視圖。
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    state: &'a Variable,
    adjoint: Option<&'a Variable>
}

impl<'a> StateView<'a> {
    pub fn state(&self) -> &'a Variable {
        self.state
    }

    /// `require_adjoints` 關閉時，沒有 adjoint 檔案的 state 回傳 `None`。
    pub fn adjoint(&self) -> Option<&'a Variable> {
        self.adjoint
    }
}

/// 一個 BOCOP 解目錄的完整內容。
///
/// 建構時一次讀入並處理所有變數；任何錯誤都使整個載入失敗。
/// 建構完成後唯讀，可在多執行緒間共享。
#[derive(Debug, Clone)]
pub struct BocopSolution {
    working_directory: PathBuf,
    discretization_times: Vec<f64>,
    stage_times: Vec<f64>,
    parameters: NumericArray,
    states: VariableBunch,
    adjoint_states: VariableBunch,
    controls: VariableBunch,
    table: SolutionTable
}

impl BocopSolution {
    pub fn load(working_directory: impl AsRef<Path>) -> Result<BocopSolution> {
        Self::load_with_configuration(working_directory, &Configuration::new())
    }

    pub fn load_with_configuration(
        working_directory: impl AsRef<Path>,
        configuration: &Configuration,
    ) -> Result<BocopSolution> {
        let working_directory = working_directory.as_ref().to_path_buf();
        if !working_directory.is_dir() {
            return Err(ReaderError::invalid_input(format!(
                "{:?} is not a directory",
                working_directory
            )));
        }

        let discretization_times = match read_named(&working_directory, DISCRETIZATION_TIMES)? {
            Some(content) => content.into_array().to_vector(DISCRETIZATION_TIMES)?,
            None => {
                return Err(ReaderError::invalid_input(format!(
                    "{:?} has no {}.{} file",
                    working_directory, DISCRETIZATION_TIMES, EXPORT_EXTENSION
                )));
            }
        };
        let stage_times = read_optional(&working_directory, STAGE_TIMES)?.to_vector(STAGE_TIMES)?;
        let parameters = read_optional(&working_directory, PARAMETERS)?;

        let names = scan_variable_names(&working_directory)?;
        let mut state_names: BTreeSet<String> = names
            .iter()
            .filter(|name| names.contains(&adjoint_name(name)))
            .cloned()
            .collect();
        for declared in configuration.declared_states() {
            if !names.contains(declared) {
                return Err(ReaderError::invalid_input(format!(
                    "declared state '{}' has no {}.{} file",
                    declared, declared, EXPORT_EXTENSION
                )));
            }
            state_names.insert(declared.clone());
        }
        let control_names: BTreeSet<String> = names
            .iter()
            .filter(|name| names.contains(&format!("{}{}", STAGE_PREFIX, name)))
            .cloned()
            .collect();
        debug!(
            states = ?state_names,
            controls = ?control_names,
            "classified solution files"
        );

        let loader = VariableLoader {
            working_directory: &working_directory,
            discretization_times: &discretization_times,
            stage_times: &stage_times,
            configuration
        };

        // 第一階段：建立所有變數
        let adjoint_states = VariableBunch::new(
            VariableKind::AdjointState,
            state_names
                .iter()
                .map(|name| adjoint_name(name))
                .filter(|adjoint| names.contains(adjoint))
                .map(|adjoint| loader.load(&adjoint, VariableKind::AdjointState))
                .collect::<Result<Vec<_>>>()?,
        )?;
        let mut states = VariableBunch::new(
            VariableKind::State,
            state_names
                .iter()
                .map(|name| loader.load(name, VariableKind::State))
                .collect::<Result<Vec<_>>>()?,
        )?;
        let controls = VariableBunch::new(
            VariableKind::Control,
            control_names
                .iter()
                .map(|name| loader.load(name, VariableKind::Control))
                .collect::<Result<Vec<_>>>()?,
        )?;

        // 第二階段：連結 state 與 adjoint
        for name in &state_names {
            let adjoint = adjoint_name(name);
            if adjoint_states.contains(&adjoint) {
                if let Some(state) = states.get_mut(name) {
                    state.link_adjoint(adjoint);
                }
            } else if configuration.require_adjoints() {
                return Err(ReaderError::MissingAdjoint { state: name.clone(), adjoint });
            } else {
                warn!(state = %name, "state has no adjoint variable, leaving it unlinked");
            }
        }

        let table = SolutionTable::concat(&[states.table(), controls.table()]);
        info!(
            directory = ?working_directory,
            states = states.len(),
            adjoint_states = adjoint_states.len(),
            controls = controls.len(),
            "loaded solution"
        );

        Ok(BocopSolution {
            working_directory,
            discretization_times,
            stage_times,
            parameters,
            states,
            adjoint_states,
            controls,
            table
        })
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn discretization_times(&self) -> &[f64] {
        &self.discretization_times
    }

    pub fn stage_times(&self) -> &[f64] {
        &self.stage_times
    }

    pub fn parameters(&self) -> &NumericArray {
        &self.parameters
    }

    pub fn states(&self) -> &VariableBunch {
        &self.states
    }

    pub fn adjoint_states(&self) -> &VariableBunch {
        &self.adjoint_states
    }

    pub fn controls(&self) -> &VariableBunch {
        &self.controls
    }

    /// state 與 control 合併後的表格。
    pub fn table(&self) -> &SolutionTable {
        &self.table
    }

    pub fn state(&self, name: &str) -> Result<StateView<'_>> {
        let state = self.states.get(name)?;
        let adjoint = match state.adjoint_name() {
            Some(adjoint) => Some(self.adjoint_states.get(adjoint)?),
            None => None,
        };
        Ok(StateView { state, adjoint })
    }

    pub fn adjoint_of(&self, state_name: &str) -> Result<&Variable> {
        let state = self.states.get(state_name)?;
        match state.adjoint_name() {
            Some(adjoint) => self.adjoint_states.get(adjoint),
            None => Err(ReaderError::MissingAdjoint {
                state: state_name.to_owned(),
                adjoint: adjoint_name(state_name)
            }),
        }
    }

    /// 依序在 states、adjoint states、controls 中尋找。
    pub fn variable(&self, name: &str) -> Result<&Variable> {
        [&self.states, &self.adjoint_states, &self.controls]
            .into_iter()
            .find_map(|bunch| bunch.get(name).ok())
            .ok_or_else(|| ReaderError::name_not_found(name))
    }
}

impl fmt::Display for BocopSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BocopSolution({})", self.working_directory.display())
    }
}

struct VariableLoader<'a> {
    working_directory: &'a Path,
    discretization_times: &'a [f64],
    stage_times: &'a [f64],
    configuration: &'a Configuration
}

impl VariableLoader<'_> {
    /// 樣本數與 stage times 相同時使用 stage times，否則使用 discretization times。
    fn load(&self, name: &str, kind: VariableKind) -> Result<Variable> {
        let values = match read_named(self.working_directory, name)? {
            Some(content) => content.into_array().to_vector(name)?,
            None => {
                return Err(ReaderError::invalid_input(format!(
                    "variable '{}' has no {}.{} file",
                    name, name, EXPORT_EXTENSION
                )));
            }
        };
        let times = if values.len() == self.stage_times.len() {
            debug!(variable = name, "using stage times");
            self.stage_times
        } else {
            self.discretization_times
        };
        let series = SampledSeries::new(name, times.to_vec(), values)?;
        Variable::new(name, kind, series, self.configuration)
    }
}

fn export_path(working_directory: &Path, name: &str) -> PathBuf {
    working_directory.join(format!("{}.{}", name, EXPORT_EXTENSION))
}

/// 讀取 `<name>.export`；檔案不存在時回傳 `None`。
fn read_named(working_directory: &Path, name: &str) -> Result<Option<ExportContent>> {
    match read_export(&export_path(working_directory, name)) {
        Ok(content) => Ok(Some(content)),
        Err(ReaderError::IOError(error)) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

fn read_optional(working_directory: &Path, name: &str) -> Result<NumericArray> {
    match read_named(working_directory, name)? {
        Some(content) => {
            if content.is_empty() {
                debug!(file = name, "empty file replaced by placeholder");
            }
            Ok(content.into_array())
        }
        None => {
            debug!(file = name, "missing file replaced by placeholder");
            Ok(NumericArray::placeholder())
        }
    }
}

/// 目錄中所有 `.export` 檔的名稱（不含保留檔名）。
fn scan_variable_names(working_directory: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(working_directory)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(EXPORT_EXTENSION) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            warn!(file = ?path, "skipping file with a non UTF-8 name");
            continue;
        };
        if !CONSTANT_NAMES.contains(&stem) {
            names.insert(stem.to_owned());
        }
    }
    Ok(names)
}
