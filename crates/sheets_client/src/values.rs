//! Cell values as exchanged with the Sheets API, and the pure helpers that
//! work over them: column letters, first-match row lookup, text rendering.
//!
//! Nothing in this module talks to the network.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell as returned by (or sent to) the values API.
///
/// Serialized untagged: `null` ↔ `Empty`, JSON bool, number, string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// One row of cells. Rows in a table need not have the same length.
pub type Row = Vec<CellValue>;

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Default rendering, used for row matching and [`data_to_string`].
///
/// Numbers use the shortest round-trip decimal form (`5.0` renders as `5`,
/// never with an exponent). Booleans render as `true` / `false`.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Convert column letters to a 0-based index (A=0, Z=25, AA=26, ZZZ=18277).
///
/// Case-insensitive bijective base-26. Returns `None` for an empty string,
/// any non-letter character, or a column too wide to index.
pub fn column_index(column: &str) -> Option<usize> {
    if column.is_empty() {
        return None;
    }

    let mut col = 0usize;
    for c in column.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
    }
    Some(col - 1)
}

/// Find the first row whose cell in `column` renders exactly as `value`.
///
/// Returns the 1-based row position, or `None` if nothing matches. Rows too
/// short to have the column are skipped. Comparison is exact: no trimming,
/// no case folding.
pub fn find_row_number(data: &[Row], column: &str, value: &str) -> Option<usize> {
    let col = column_index(column)?;

    data.iter()
        .position(|row| row.get(col).is_some_and(|cell| cell.to_string() == value))
        .map(|i| i + 1)
}

/// Render rows as tab-separated text for display.
///
/// Every cell is followed by a tab (including the last one in a row) and
/// every row by a newline. No padding between rows of different length.
pub fn data_to_string(data: &[Row]) -> String {
    let mut out = String::new();
    for row in data {
        for cell in row {
            out.push_str(&cell.to_string());
            out.push('\t');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .map(|r| r.iter().map(|s| CellValue::from(*s)).collect())
            .collect()
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("B"), Some(1));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("AZ"), Some(51));
        assert_eq!(column_index("BX"), Some(75));
        assert_eq!(column_index("ZZ"), Some(701));
        assert_eq!(column_index("AAA"), Some(702));
        assert_eq!(column_index("ZZZ"), Some(18277));
    }

    #[test]
    fn test_column_index_case_insensitive() {
        assert_eq!(column_index("bx"), Some(75));
        assert_eq!(column_index("Aa"), Some(26));
    }

    #[test]
    fn test_column_index_rejects_non_letters() {
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
        assert_eq!(column_index("-"), None);
        assert_eq!(column_index("É"), None);
    }

    #[test]
    fn test_column_index_is_bijective_over_two_letters() {
        // Every 1- and 2-letter code maps to a distinct, gapless index
        let mut seen = Vec::new();
        for a in 'A'..='Z' {
            seen.push(column_index(&a.to_string()).unwrap());
        }
        for a in 'A'..='Z' {
            for b in 'A'..='Z' {
                seen.push(column_index(&format!("{a}{b}")).unwrap());
            }
        }
        let expected: Vec<usize> = (0..26 + 26 * 26).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_find_row_number() {
        let data = rows(&[&["Value1", "Value2"], &["Value3", "Value4"]]);
        assert_eq!(find_row_number(&data, "A", "Value3"), Some(2));
        assert_eq!(find_row_number(&data, "B", "Value2"), Some(1));
        assert_eq!(find_row_number(&data, "A", "Value99"), None);
    }

    #[test]
    fn test_find_row_number_empty_data() {
        assert_eq!(find_row_number(&[], "A", "Value1"), None);
    }

    #[test]
    fn test_find_row_number_column_out_of_range() {
        let data = rows(&[&["Value1", "Value2"], &["Value3", "Value4"]]);
        assert_eq!(find_row_number(&data, "C", "Value1"), None);
    }

    #[test]
    fn test_find_row_number_skips_short_rows() {
        let data = rows(&[&["id"], &["1", "x"], &[], &["2", "target"]]);
        assert_eq!(find_row_number(&data, "B", "target"), Some(4));
    }

    #[test]
    fn test_find_row_number_first_match_wins() {
        let data = rows(&[&["dup"], &["other"], &["dup"]]);
        assert_eq!(find_row_number(&data, "A", "dup"), Some(1));
    }

    #[test]
    fn test_find_row_number_exact_match_only() {
        let data = rows(&[&["Value1 "], &["value1"], &["Value1"]]);
        assert_eq!(find_row_number(&data, "A", "Value1"), Some(3));
    }

    #[test]
    fn test_find_row_number_typed_cells() {
        let data = vec![
            vec![CellValue::Number(5.0), CellValue::Bool(true)],
            vec![CellValue::Number(2.5), CellValue::Empty],
        ];
        assert_eq!(find_row_number(&data, "A", "5"), Some(1));
        assert_eq!(find_row_number(&data, "A", "5.0"), None);
        assert_eq!(find_row_number(&data, "A", "2.5"), Some(2));
        assert_eq!(find_row_number(&data, "B", "true"), Some(1));
        assert_eq!(find_row_number(&data, "B", ""), Some(2));
    }

    #[test]
    fn test_find_row_number_invalid_column() {
        let data = rows(&[&["a"]]);
        assert_eq!(find_row_number(&data, "1", "a"), None);
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Bool(false).to_string(), "false");
        assert_eq!(CellValue::Number(5.0).to_string(), "5");
        assert_eq!(CellValue::Number(-0.25).to_string(), "-0.25");
        assert_eq!(CellValue::Number(1e21).to_string(), "1000000000000000000000");
        assert_eq!(CellValue::from("  spaced ").to_string(), "  spaced ");
    }

    #[test]
    fn test_cell_json_mapping() {
        let row: Row = serde_json::from_str(r#"["a", 1, 2.5, true, null]"#).unwrap();
        assert_eq!(
            row,
            vec![
                CellValue::Text("a".into()),
                CellValue::Number(1.0),
                CellValue::Number(2.5),
                CellValue::Bool(true),
                CellValue::Empty,
            ]
        );

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!(["a", 1.0, 2.5, true, null]));
    }

    #[test]
    fn test_cell_accessors() {
        let row: Row = serde_json::from_str(r#"["Ada", null, 4, false]"#).unwrap();
        let empties: Vec<bool> = row.iter().map(CellValue::is_empty).collect();
        assert_eq!(empties, vec![false, true, false, false]);

        assert_eq!(row[0].as_str(), Some("Ada"));
        assert_eq!(row[1].as_str(), None);
        // Numbers are not text even though they render as text
        assert_eq!(row[2].as_str(), None);
        assert_eq!(row[3].as_str(), None);
        assert!(CellValue::default().is_empty());
    }

    #[test]
    fn test_cell_from_option() {
        assert_eq!(CellValue::from(None::<&str>), CellValue::Empty);
        assert_eq!(CellValue::from(Some(3i64)), CellValue::Number(3.0));
    }

    #[test]
    fn test_data_to_string() {
        let data = rows(&[&["Value1", "Value2"], &["Value3", "Value4"]]);
        assert_eq!(data_to_string(&data), "Value1\tValue2\t\nValue3\tValue4\t\n");
    }

    #[test]
    fn test_data_to_string_ragged_rows() {
        let data = rows(&[&["Value1", "Value2"], &["Value3"]]);
        assert_eq!(data_to_string(&data), "Value1\tValue2\t\nValue3\t\n");
    }

    #[test]
    fn test_data_to_string_empty() {
        assert_eq!(data_to_string(&[]), "");
        assert_eq!(data_to_string(&[vec![]]), "\n");
    }

    #[test]
    fn test_data_to_string_mixed_types() {
        let data = vec![vec![
            CellValue::Number(42.0),
            CellValue::Bool(true),
            CellValue::Empty,
            CellValue::from("x"),
        ]];
        assert_eq!(data_to_string(&data), "42\ttrue\t\tx\t\n");
    }
}
