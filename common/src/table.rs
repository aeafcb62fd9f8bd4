use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use eyre::{Context, ContextCompat, Result};
use tokio::fs::{read_to_string, try_exists};
use tracing::{debug, warn};

use crate::{config::Schema, label::LabelScheme, metric::Metric};

/// A header-led measurement table with the label and metric columns resolved
#[derive(Debug, Clone)]
pub struct MeasurementTable {
    scheme: LabelScheme,
    label_idx: usize,
    metric_idx: Vec<(Metric, usize)>,
    rows: Vec<StringRecord>,
}

/// A single row of a [`MeasurementTable`]
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a MeasurementTable,
    record: &'a StringRecord,
    line: u64,
}

impl MeasurementTable {
    /// Reads the table at `path`.
    ///
    /// Returns `None` after reporting the missing file when `path` does not
    /// exist.
    pub async fn load(path: &Path, schema: &Schema) -> Result<Option<Self>> {
        if !try_exists(path)
            .await
            .context(format!("Check {}", path.display()))?
        {
            println!("File {} not found.", path.display());
            warn!("Input {} missing, skipping", path.display());
            return Ok(None);
        }

        let data = read_to_string(path)
            .await
            .context(format!("Read {}", path.display()))?;
        let table = Self::parse(&data, schema).context(format!("Parse {}", path.display()))?;
        debug!("Read {} rows from {}", table.len(), path.display());
        Ok(Some(table))
    }

    pub fn parse(data: &str, schema: &Schema) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers = reader.headers().context("Read header")?.clone();
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .context(format!("Missing column {column}"))
        };

        let label_idx = position(&schema.label_column)?;
        let metric_idx = Metric::ALL
            .iter()
            .map(|metric| Ok((*metric, position(schema.column(*metric))?)))
            .collect::<Result<Vec<_>>>()?;

        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .context("Read records")?;

        Ok(Self {
            scheme: schema.label_scheme,
            label_idx,
            metric_idx,
            rows,
        })
    }

    /// How the label column is parsed
    pub fn scheme(&self) -> LabelScheme {
        self.scheme
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|record| Row {
            table: self,
            record,
            line: record.position().map(|p| p.line()).unwrap_or_default(),
        })
    }
}

impl Row<'_> {
    pub fn label(&self) -> &str {
        self.record.get(self.table.label_idx).unwrap_or_default()
    }

    pub fn value(&self, metric: Metric) -> Result<f64> {
        let idx = self
            .table
            .metric_idx
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, idx)| *idx)
            .context(format!("Unknown metric {metric}"))?;
        let raw = self
            .record
            .get(idx)
            .context(format!("Missing {metric} on line {}", self.line))?;
        raw.parse::<f64>()
            .context(format!("Parse {metric} value {raw:?} on line {}", self.line))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    const SCALING: &str = "Configuration, Duration, CPU_Usage, Mem_Usage, IO_Usage
Program_A_Scaling_cpu_4, 12.5, 80.0, 30.0, 10.0
Program_B_Scaling_mem_2, 3.25, 50.0, 40.0, 1.0
";

    #[test]
    fn whitespace_after_delimiters_is_ignored() {
        let table = MeasurementTable::parse(SCALING, &Schema::scaling()).unwrap();
        assert_eq!(table.len(), 2);
        let row = table.rows().next().unwrap();
        assert_eq!(row.label(), "Program_A_Scaling_cpu_4");
        assert_eq!(row.value(Metric::Duration).unwrap(), 12.5);
        assert_eq!(row.value(Metric::IoUsage).unwrap(), 10.0);
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = MeasurementTable::parse(
            "Configuration,Duration,CPU_Usage,Mem_Usage\nProgram_A_Scaling_cpu_4,1,2,3\n",
            &Schema::scaling(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("IO_Usage"));
    }

    #[test]
    fn bad_value_names_column() {
        let table = MeasurementTable::parse(
            "Configuration,Duration,CPU_Usage,Mem_Usage,IO_Usage\nProgram_A_Scaling_cpu_4,fast,2,3,4\n",
            &Schema::scaling(),
        )
        .unwrap();
        let err = table.rows().next().unwrap().value(Metric::Duration).unwrap_err();
        assert!(format!("{err:#}").contains("Duration"));
    }

    #[tokio::test]
    async fn missing_file_yields_no_table() {
        let path = PathBuf::from("definitely-not-here").join("missing.csv");
        let table = MeasurementTable::load(&path, &Schema::scaling())
            .await
            .unwrap();
        assert!(table.is_none());
    }

    #[tokio::test]
    async fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("table-load-{}.csv", std::process::id()));
        tokio::fs::write(&path, SCALING).await.unwrap();
        let table = MeasurementTable::load(&path, &Schema::scaling())
            .await
            .unwrap()
            .unwrap();
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(table.len(), 2);
    }
}
