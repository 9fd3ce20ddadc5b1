use crate::error::ExcelSchemaError;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use std::collections::BTreeMap;
use std::collections::HashMap;

/// One worksheet's populated cells, in the order they were decoded.
///
/// The header is the first populated row; every later row holding at least
/// one cell is a data row. The column span runs from the leftmost to the
/// rightmost populated column of the whole sheet.
#[derive(Debug)]
pub(crate) struct Sheet {
    pub(crate) name: String,
    pub(crate) cells: Vec<Cell>,
    pub(crate) col_lower_bound: Option<usize>,
    pub(crate) col_upper_bound: Option<usize>,
}

impl Sheet {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            cells: Vec::new(),
            col_lower_bound: None,
            col_upper_bound: None,
        }
    }

    /// Adds a cell, widening the populated column span.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.col_lower_bound = Some(self.col_lower_bound.map_or(cell.col, |col| col.min(cell.col)));
        self.col_upper_bound = Some(self.col_upper_bound.map_or(cell.col, |col| col.max(cell.col)));
        self.cells.push(cell);
    }

    fn column_span(&self) -> std::ops::RangeInclusive<usize> {
        match self.col_lower_bound.zip(self.col_upper_bound) {
            Some((lower, upper)) => lower..=upper,
            #[allow(clippy::reversed_empty_ranges)]
            None => 1..=0,
        }
    }

    /// Cells grouped by row, rows in ascending order.
    fn rows(&self) -> BTreeMap<usize, HashMap<usize, &Cell>> {
        let mut rows: BTreeMap<usize, HashMap<usize, &Cell>> = BTreeMap::new();
        for cell in &self.cells {
            rows.entry(cell.row).or_default().insert(cell.col, cell);
        }
        rows
    }

    /// Number of populated rows below the header.
    pub(crate) fn data_row_count(&self) -> usize {
        self.rows().len().saturating_sub(1)
    }

    /// Column labels from the header row, blanks named `Unnamed: <i>` and
    /// repeats suffixed `.1`, `.2`, ...
    pub(crate) fn headers(&self) -> Result<Vec<String>, ExcelSchemaError> {
        let rows = self.rows();
        let header = rows.values().next();
        let mut labels = Vec::new();
        for (index, col) in self.column_span().enumerate() {
            let label = match header.and_then(|cells| cells.get(&col)) {
                Some(cell) => header_label(cell)?,
                None => None,
            };
            labels.push(label.unwrap_or_else(|| format!("Unnamed: {index}")));
        }
        Ok(deduplicate(labels))
    }

    /// Data cells in column-major order: one vector per column of the span,
    /// one entry per data row, `None` where the row has no cell.
    pub(crate) fn columns(&self) -> Vec<Vec<Option<&Cell>>> {
        let rows = self.rows();
        self.column_span()
            .map(|col| rows.values().skip(1).map(|cells| cells.get(&col).copied()).collect())
            .collect()
    }
}

fn header_label(cell: &Cell) -> Result<Option<String>, ExcelSchemaError> {
    let label = match cell.kind {
        CellType::Text | CellType::Error => Some(cell.value.clone()),
        _ => cell.to_value()?.map(|value| value.to_string()),
    };
    // Whitespace is a real label: it sanitizes to `unnamed_column`.
    Ok(label.filter(|label| !label.is_empty()))
}

/// `a, a, a.1` becomes `a, a.1, a.1.1`: a suffixed name that collides with
/// a later label is itself suffixed again.
fn deduplicate(labels: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    labels
        .into_iter()
        .map(|mut label| {
            let mut count = counts.get(&label).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(label.clone(), count + 1);
                label = format!("{label}.{count}");
                count = counts.get(&label).copied().unwrap_or(0);
            }
            counts.insert(label.clone(), count + 1);
            label
        })
        .collect()
}
