//! Frame-indexed tables
//!
//! The one tabular currency of the crate: an explicit integer row index plus
//! named numeric columns of equal length. Joins intersect indices, so tables of
//! differing length truncate the result to the shortest common span; callers
//! rely on that alignment-by-truncation, and it must not be widened to an
//! outer join.

use serde::{Deserialize, Serialize};

use crate::downsample::block_mean;
use crate::error::ExtractError;

/// One named numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// A frame-indexed table of named numeric columns.
///
/// The index carries frame numbers, or second numbers after downsampling.
/// All columns have the same length as the index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameTable {
    index: Vec<u64>,
    columns: Vec<Column>,
}

impl FrameTable {
    /// Empty table: no rows, no columns
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs with a default 0..n index.
    ///
    /// All columns must have the same length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.push_column(name.into(), values)?;
        }
        Ok(table)
    }

    /// Append a column. The first column fixes the row count and a 0..n index;
    /// later columns must match it.
    pub fn push_column(&mut self, name: String, values: Vec<f64>) -> Result<(), ExtractError> {
        if self.columns.is_empty() && self.index.is_empty() {
            self.index = (0..values.len() as u64).collect();
        } else if values.len() != self.index.len() {
            return Err(ExtractError::malformed(format!(
                "column '{}' has {} rows, expected {}",
                name,
                values.len(),
                self.index.len()
            )));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when the table has no rows and no columns
    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.columns.is_empty()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Row index labels
    pub fn index(&self) -> &[u64] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
    }

    /// New table with every column name prefixed
    pub fn with_prefix(&self, prefix: &str) -> FrameTable {
        FrameTable {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: format!("{prefix}{}", c.name),
                    values: c.values.clone(),
                })
                .collect(),
        }
    }

    /// Inner join on the row index: the result keeps the rows whose index
    /// labels appear in both tables, in this table's order, with this table's
    /// columns followed by `other`'s.
    pub fn inner_join(&self, other: &FrameTable) -> FrameTable {
        let positions: std::collections::HashMap<u64, usize> = other
            .index
            .iter()
            .enumerate()
            .map(|(pos, &label)| (label, pos))
            .collect();

        let keep: Vec<(usize, usize)> = self
            .index
            .iter()
            .enumerate()
            .filter_map(|(pos, label)| positions.get(label).map(|&opos| (pos, opos)))
            .collect();

        let index = keep.iter().map(|&(pos, _)| self.index[pos]).collect();
        let mut columns = Vec::with_capacity(self.columns.len() + other.columns.len());
        for c in &self.columns {
            columns.push(Column {
                name: c.name.clone(),
                values: keep.iter().map(|&(pos, _)| c.values[pos]).collect(),
            });
        }
        for c in &other.columns {
            columns.push(Column {
                name: c.name.clone(),
                values: keep.iter().map(|&(_, opos)| c.values[opos]).collect(),
            });
        }

        FrameTable { index, columns }
    }

    /// Drop the first `offset` rows, keeping index labels
    pub fn tail_from(&self, offset: usize) -> FrameTable {
        let offset = offset.min(self.index.len());
        FrameTable {
            index: self.index[offset..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[offset..].to_vec(),
                })
                .collect(),
        }
    }

    /// Keep only the rows at the given positions, re-labeling nothing
    pub fn select_rows(&self, rows: &[usize]) -> FrameTable {
        FrameTable {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r]).collect(),
                })
                .collect(),
        }
    }

    /// Keep only the named columns, in the order given
    pub fn select_columns(&self, names: &[&str]) -> FrameTable {
        FrameTable {
            index: self.index.clone(),
            columns: names
                .iter()
                .filter_map(|name| self.columns.iter().find(|c| &c.name == name))
                .cloned()
                .collect(),
        }
    }

    /// Average every contiguous block of `rate` rows into one row, the trailing
    /// partial block over whatever rows remain. The result is re-indexed by
    /// block number (seconds when `rate` is the recording frame rate).
    ///
    /// This is the trailing-partial-block policy; plotting views use the
    /// zero-padded reshape in [`crate::downsample`] instead, and the two are
    /// intentionally separate.
    pub fn per_second(&self, rate: usize) -> FrameTable {
        if rate == 0 {
            return FrameTable::new();
        }
        let blocks = self.index.len().div_ceil(rate);
        FrameTable {
            index: (0..blocks as u64).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: block_mean(&c.values, rate),
                })
                .collect(),
        }
    }

    /// Render as delimited text: header row of column names, one row per
    /// frame, no index column
    pub fn to_delimited(&self, sep: char) -> String {
        let mut out = String::new();
        let header: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        out.push_str(&header.join(&sep.to_string()));
        out.push('\n');
        for row in 0..self.index.len() {
            let cells: Vec<String> = self
                .columns
                .iter()
                .map(|c| format!("{}", c.values[row]))
                .collect();
            out.push_str(&cells.join(&sep.to_string()));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(cols: &[(&str, &[f64])]) -> FrameTable {
        FrameTable::from_columns(cols.iter().map(|(n, v)| (n.to_string(), v.to_vec()))).unwrap()
    }

    #[test]
    fn push_column_rejects_length_mismatch() {
        let mut t = FrameTable::new();
        t.push_column("a".into(), vec![1.0, 2.0]).unwrap();
        let err = t.push_column("b".into(), vec![1.0]).unwrap_err();
        assert!(matches!(err, ExtractError::MalformedRecord(_)));
    }

    #[test]
    fn join_intersects_indices_and_truncates() {
        let long = table(&[("a", &(0..100).map(f64::from).collect::<Vec<_>>())]);
        let short = table(&[("b", &(0..80).map(f64::from).collect::<Vec<_>>())]);

        let joined = long.inner_join(&short);
        assert_eq!(joined.len(), 80);
        assert_eq!(joined.width(), 2);
        assert_eq!(joined.column("a").unwrap()[79], 79.0);
        assert_eq!(joined.column("b").unwrap()[79], 79.0);
    }

    #[test]
    fn join_keeps_index_labels() {
        let t = table(&[("a", &[1.0, 2.0, 3.0, 4.0])]);
        let sliced = t.tail_from(2);
        let joined = sliced.inner_join(&t.with_prefix("x_"));
        assert_eq!(joined.index(), &[2, 3]);
        assert_eq!(joined.column("x_a").unwrap(), &[3.0, 4.0]);
    }

    #[test]
    fn prefix_renames_all_columns() {
        let t = table(&[("1", &[0.5]), ("2", &[1.5])]);
        let prefixed = t.with_prefix("dcenter_");
        let names: Vec<&str> = prefixed.column_names().collect();
        assert_eq!(names, vec!["dcenter_1", "dcenter_2"]);
    }

    #[test]
    fn per_second_averages_blocks_and_reindexes() {
        let t = table(&[("a", &[3.0, 3.0, 3.0, 9.0, 9.0, 9.0, 6.0])]);
        let down = t.per_second(3);
        assert_eq!(down.index(), &[0, 1, 2]);
        assert_eq!(down.column("a").unwrap(), &[3.0, 9.0, 6.0]);
    }

    #[test]
    fn tail_from_drops_leading_rows() {
        let t = table(&[("a", &[1.0, 2.0, 3.0])]);
        let tail = t.tail_from(1);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail.index(), &[1, 2]);
        let all = t.tail_from(10);
        assert_eq!(all.len(), 0);
    }

    #[test]
    fn delimited_rendering_has_header_and_no_index() {
        let t = table(&[("x_1", &[1.0, 2.5]), ("y_1", &[3.0, 4.0])]);
        assert_eq!(t.to_delimited(','), "x_1,y_1\n1,3\n2.5,4\n");
    }

    #[test]
    fn empty_table_is_empty() {
        let t = FrameTable::new();
        assert!(t.is_empty());
        assert_eq!(t.to_delimited(','), "\n");
    }
}
