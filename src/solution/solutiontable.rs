use serde::Serialize;

use crate::readererror::{
    ReaderError,
    Result
};
use crate::solution::variable::Variable;

/// 以時間為列、變數為欄的表格。
///
/// 列 index 為所有欄時間軸的聯集（遞增、不重複），某欄在該時間
/// 沒有樣本時填 NaN。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionTable {
    index: Vec<f64>,
    column_names: Vec<String>,
    columns: Vec<Vec<f64>>
}

fn union_index<'a>(axes: impl IntoIterator<Item = &'a [f64]>) -> Vec<f64> {
    let mut index: Vec<f64> = axes.into_iter().flatten().copied().collect();
    index.sort_by(|a, b| a.total_cmp(b));
    index.dedup();
    index
}

fn align(index: &[f64], times: &[f64], values: &[f64]) -> Vec<f64> {
    let mut column = vec![f64::NAN; index.len()];
    for (t, &v) in times.iter().zip(values.iter()) {
        if let Ok(row) = index.binary_search_by(|probe| probe.total_cmp(t)) {
            column[row] = v;
        }
    }
    column
}

impl SolutionTable {
    pub fn empty() -> SolutionTable {
        SolutionTable { index: Vec::new(), column_names: Vec::new(), columns: Vec::new() }
    }

    pub fn from_variables<'a>(variables: impl IntoIterator<Item = &'a Variable>) -> SolutionTable {
        let variables: Vec<&Variable> = variables.into_iter().collect();
        let index = union_index(variables.iter().map(|v| v.times()));
        let columns = variables
            .iter()
            .map(|v| align(&index, v.times(), v.values()))
            .collect();
        let column_names = variables.iter().map(|v| v.name().to_owned()).collect();
        SolutionTable { index, column_names, columns }
    }

    /// 橫向合併（依欄串接），列 index 取聯集。
    pub fn concat(tables: &[&SolutionTable]) -> SolutionTable {
        let index = union_index(tables.iter().map(|table| table.index.as_slice()));
        let mut column_names = Vec::new();
        let mut columns = Vec::new();
        for table in tables {
            for (name, column) in table.column_names.iter().zip(table.columns.iter()) {
                column_names.push(name.clone());
                columns.push(align(&index, &table.index, column));
            }
        }
        SolutionTable { index, column_names, columns }
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.column_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| ReaderError::name_not_found(name))
    }

    pub fn row(&self, i: usize) -> Option<Vec<f64>> {
        if i < self.index.len() {
            Some(self.columns.iter().map(|column| column[i]).collect())
        } else {
            None
        }
    }

    /// (列數, 欄數)
    pub fn shape(&self) -> (usize, usize) {
        (self.index.len(), self.columns.len())
    }

    /// 儲存格總數
    pub fn size(&self) -> usize {
        self.index.len() * self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
