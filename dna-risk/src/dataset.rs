use std::collections::BTreeSet;
use std::path::Path;
use std::{fs, io};

use tracing::{debug, info};

use crate::error::{Result, ValidationError};

/// Cell contents read as missing
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// A CSV table of optional text cells.
///
/// Cells stay as text until the encoder sees them; whether a column is
/// numeric or categorical is decided from its contents.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "reading dataset");
        Self::from_reader(fs::File::open(path)?)
    }

    pub fn from_reader<R: io::Read>(rdr: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(rdr);

        let headers = rdr.headers()?.iter().map(str::to_string).collect::<Vec<_>>();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(missing_or_text).collect());
        }

        debug!(rows = rows.len(), columns = headers.len(), "parsed dataset");
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Remove the named columns that are present, returning the ones removed
    pub fn drop_columns(&mut self, names: &[&str]) -> Vec<String> {
        let mut dropped = Vec::new();
        for name in names {
            if let Some(idx) = self.column_index(name) {
                self.headers.remove(idx);
                for row in self.rows.iter_mut() {
                    row.remove(idx);
                }
                dropped.push(name.to_string());
            }
        }
        dropped
    }

    /// Fail naming every one of `names` that is not a column
    pub fn require_columns<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        let missing = names
            .into_iter()
            .filter(|name| self.column_index(name).is_none())
            .map(str::to_string)
            .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingColumns { columns: missing })
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_deref()))
    }

    /// A column is numeric when every present cell parses as a number. An
    /// all-missing column counts as numeric.
    pub fn is_numeric(&self, name: &str) -> bool {
        self.column(name).is_some_and(|mut cells| {
            cells.all(|cell| cell.is_none_or(|text| text.parse::<f64>().is_ok()))
        })
    }

    /// Distinct present values of a column in ascending lexicographic order
    pub fn distinct_labels(&self, name: &str) -> Vec<String> {
        let Some(cells) = self.column(name) else {
            return Vec::new();
        };
        cells
            .flatten()
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Read a cell as `None` if it is empty or one of the usual missing-value
/// markers
fn missing_or_text(cell: &str) -> Option<String> {
    if MISSING_MARKERS.contains(&cell) {
        None
    } else {
        Some(cell.to_string())
    }
}
