use std::collections::BTreeMap;
use std::fmt;

use crate::plot::phaseportrait::PhasePortrait;
use crate::plot::subplotgrid::SubplotGrid;
use crate::readererror::{
    ReaderError,
    Result
};
use crate::solution::solutiontable::SolutionTable;
use crate::solution::variable::{
    Variable,
    VariableKind
};

/// 同一種類（state / adjoint state / control）變數的集合，依名稱排序。
#[derive(Debug, Clone)]
pub struct VariableBunch {
    kind: VariableKind,
    variables: BTreeMap<String, Variable>,
    table: SolutionTable
}

impl VariableBunch {
    pub fn new(kind: VariableKind, variables: Vec<Variable>) -> Result<VariableBunch> {
        let mut map = BTreeMap::new();
        for variable in variables {
            if variable.kind() != kind {
                return Err(ReaderError::invalid_input(format!(
                    "{} cannot be stored in {}",
                    variable,
                    kind.bunch_title()
                )));
            }
            let name = variable.name().to_owned();
            if map.insert(name.clone(), variable).is_some() {
                return Err(ReaderError::invalid_input(format!(
                    "duplicate variable '{}' in {}",
                    name,
                    kind.bunch_title()
                )));
            }
        }
        let table = SolutionTable::from_variables(map.values());
        Ok(VariableBunch { kind, variables: map, table })
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn get(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| ReaderError::name_not_found(name))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.variables.keys().map(|name| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.variables.values()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn table(&self) -> &SolutionTable {
        &self.table
    }

    /// 表格儲存格總數（列數 × 欄數）
    pub fn size(&self) -> usize {
        self.table.size()
    }

    pub fn subplot_grid(&self, n_cols: usize, n_rows: usize) -> Result<SubplotGrid> {
        let variables: Vec<&Variable> = self.iter().collect();
        SubplotGrid::new(self.kind.bunch_title(), n_cols, n_rows, &variables)
    }

    /// 只有 state 與 adjoint state 有相圖。
    pub fn phase_portrait(&self, state_x: &str, state_y: &str) -> Result<PhasePortrait> {
        if !self.kind.supports_phase_portrait() {
            return Err(ReaderError::invalid_input(format!(
                "{} have no phase portrait",
                self.kind.bunch_title()
            )));
        }
        PhasePortrait::new(self.get(state_x)?, self.get(state_y)?)
    }
}

impl<'a> IntoIterator for &'a VariableBunch {
    type Item = &'a Variable;
    type IntoIter = std::collections::btree_map::Values<'a, String, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.values()
    }
}

impl fmt::Display for VariableBunch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|v| v.to_string()).collect();
        write!(f, "{}([{}])", self.kind.bunch_title(), names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::Configuration;
    use crate::solution::sampledseries::SampledSeries;

    fn variable(name: &str, kind: VariableKind) -> Variable {
        let series = SampledSeries::new(name, vec![0.0, 1.0, 2.0], vec![1.0, 0.0, 2.0]).unwrap();
        Variable::new(name, kind, series, &Configuration::new()).unwrap()
    }

    #[test]
    fn lookup_by_name_and_sorted_iteration() {
        let bunch = VariableBunch::new(
            VariableKind::State,
            vec![variable("y", VariableKind::State), variable("x", VariableKind::State)],
        )
        .unwrap();
        assert_eq!(bunch.len(), 2);
        assert_eq!(bunch.names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(bunch.get("y").unwrap().name(), "y");
        assert!(matches!(bunch.get("z"), Err(ReaderError::NameNotFound(_))));
        assert_eq!(bunch.size(), 6);
        assert_eq!(bunch.to_string(), "States([State(x), State(y)])");
        assert_eq!((&bunch).into_iter().count(), 2);
    }

    #[test]
    fn rejects_wrong_kind_and_duplicates() {
        let err = VariableBunch::new(VariableKind::State, vec![variable("u", VariableKind::Control)]);
        assert!(matches!(err, Err(ReaderError::InvalidInput(_))));
        let err = VariableBunch::new(
            VariableKind::Control,
            vec![variable("u", VariableKind::Control), variable("u", VariableKind::Control)],
        );
        assert!(matches!(err, Err(ReaderError::InvalidInput(_))));
    }

    #[test]
    fn phase_portrait_only_for_states() {
        let states = VariableBunch::new(
            VariableKind::State,
            vec![variable("x", VariableKind::State), variable("y", VariableKind::State)],
        )
        .unwrap();
        assert!(states.phase_portrait("x", "y").is_ok());
        assert!(matches!(states.phase_portrait("x", "z"), Err(ReaderError::NameNotFound(_))));

        let controls = VariableBunch::new(
            VariableKind::Control,
            vec![variable("u", VariableKind::Control), variable("v", VariableKind::Control)],
        )
        .unwrap();
        assert!(matches!(controls.phase_portrait("u", "v"), Err(ReaderError::InvalidInput(_))));
    }

    #[test]
    fn subplot_grid_uses_bunch_title() {
        let controls = VariableBunch::new(VariableKind::Control, vec![variable("u", VariableKind::Control)]).unwrap();
        let grid = controls.subplot_grid(0, 0).unwrap();
        assert_eq!(grid.title(), "Controls");
        assert!(matches!(controls.subplot_grid(2, 1), Err(ReaderError::ShapeMismatch { .. })));
    }
}
