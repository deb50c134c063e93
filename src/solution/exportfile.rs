use std::fs;
use std::path::Path;

use crate::readererror::{
    ReaderError,
    Result
};

pub const EXPORT_EXTENSION: &str = "export";

/// 以列為主（row-major）儲存的二維數值陣列。
#[derive(Debug, Clone, PartialEq)]
pub struct NumericArray {
    values: Vec<f64>,
    n_rows: usize,
    n_cols: usize
}

impl NumericArray {
    /// 空檔案的替代值：1×1 的 NaN。
    pub fn placeholder() -> NumericArray {
        NumericArray { values: vec![f64::NAN], n_rows: 1, n_cols: 1 }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i < self.n_rows {
            Some(&self.values[i * self.n_cols..(i + 1) * self.n_cols])
        } else {
            None
        }
    }

    /// 單行或單列的陣列攤平成一維；真正的二維陣列視為形狀錯誤。
    pub fn to_vector(&self, name: &str) -> Result<Vec<f64>> {
        if self.n_cols == 1 || self.n_rows == 1 {
            Ok(self.values.clone())
        } else {
            Err(ReaderError::invalid_input(format!(
                "'{}' has shape {}x{}, expected a one-dimensional series",
                name, self.n_rows, self.n_cols
            )))
        }
    }
}

/// 單一 `.export` 檔案的解析結果。
#[derive(Debug, Clone, PartialEq)]
pub enum ExportContent {
    /// 沒有任何數值（空檔或只有空白、註解）
    Empty,
    Data(NumericArray)
}

impl ExportContent {
    pub fn is_empty(&self) -> bool {
        matches!(self, ExportContent::Empty)
    }

    pub fn into_array(self) -> NumericArray {
        match self {
            ExportContent::Empty => NumericArray::placeholder(),
            ExportContent::Data(array) => array
        }
    }
}

/// 解析以空白分隔數值、每行一列的文字內容。
///
/// `#` 之後視為註解，空行略過。非數值的 token 或欄數不一致
/// 回傳 `MalformedFile`。
pub fn parse_export(text: &str, path: &Path) -> Result<ExportContent> {
    let mut values = Vec::new();
    let mut n_rows = 0;
    let mut n_cols = 0;

    for (line_index, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("");
        let mut row_len = 0;
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| ReaderError::MalformedFile {
                path: path.to_path_buf(),
                line: line_index + 1,
                token: token.to_owned()
            })?;
            values.push(value);
            row_len += 1;
        }
        if row_len == 0 {
            continue;
        }
        if n_rows == 0 {
            n_cols = row_len;
        } else if row_len != n_cols {
            return Err(ReaderError::MalformedFile {
                path: path.to_path_buf(),
                line: line_index + 1,
                token: format!("<{} columns, expected {}>", row_len, n_cols)
            });
        }
        n_rows += 1;
    }

    if values.is_empty() {
        Ok(ExportContent::Empty)
    } else {
        Ok(ExportContent::Data(NumericArray { values, n_rows, n_cols }))
    }
}

pub fn read_export(path: &Path) -> Result<ExportContent> {
    let text = fs::read_to_string(path)?;
    parse_export(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ExportContent> {
        parse_export(text, Path::new("x.export"))
    }

    #[test]
    fn parses_single_column() {
        let array = parse("0.0\n0.5\n\n1.0\n").unwrap().into_array();
        assert_eq!(array.n_rows(), 3);
        assert_eq!(array.n_cols(), 1);
        assert_eq!(array.to_vector("x").unwrap(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn parses_multi_column_rows() {
        let array = parse("1 2 3\n4 5 6 # comment\n").unwrap().into_array();
        assert_eq!((array.n_rows(), array.n_cols()), (2, 3));
        assert_eq!(array.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert!(array.row(2).is_none());
        assert!(matches!(array.to_vector("p"), Err(ReaderError::InvalidInput(_))));
    }

    #[test]
    fn single_row_flattens() {
        let array = parse("1e-3 2.5E2 -4").unwrap().into_array();
        assert_eq!(array.to_vector("x").unwrap(), vec![1e-3, 250.0, -4.0]);
    }

    #[test]
    fn empty_content_becomes_placeholder() {
        let content = parse("  \n\n").unwrap();
        assert!(content.is_empty());
        let array = content.into_array();
        assert_eq!(array.len(), 1);
        assert!(array.as_slice()[0].is_nan());
    }

    #[test]
    fn non_numeric_token_is_malformed() {
        match parse("1.0\nabc\n") {
            Err(ReaderError::MalformedFile { line, token, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(token, "abc");
            }
            other => panic!("expected MalformedFile, got {:?}", other),
        }
    }

    #[test]
    fn ragged_rows_are_malformed() {
        assert!(matches!(parse("1 2\n3\n"), Err(ReaderError::MalformedFile { .. })));
    }
}
