use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};

pub type Cell = Option<String>;

pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Cell>,
}

/// Columns keep first-seen order and every column always holds exactly
/// `row_count()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl WideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut index = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column.values.len() != rows {
                return Err(anyhow!(
                    "column {} has {} values, expected {rows}",
                    column.name,
                    column.values.len()
                ));
            }
            if index.insert(column.name.clone(), idx).is_some() {
                return Err(anyhow!("duplicate column {}", column.name));
            }
        }
        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 && self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        let idx = *self.index.get(name)?;
        Some(&self.columns[idx].values)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut [Cell]> {
        let idx = *self.index.get(name)?;
        Some(&mut self.columns[idx].values)
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        self.column(name)?.get(row)?.as_deref()
    }

    pub fn concat(tables: impl IntoIterator<Item = WideTable>) -> WideTable {
        let mut assembler = WideTableAssembler::new();
        for table in tables {
            for column in &table.columns {
                assembler.ensure_column(&column.name);
            }
            for row in 0..table.rows {
                assembler.add_record(
                    table
                        .columns
                        .iter()
                        .map(|c| (c.name.clone(), c.values[row].clone())),
                );
            }
        }
        assembler.finish()
    }

    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let mut writer = csv::Writer::from_writer(out);
        writer
            .write_record(self.column_names())
            .context("write csv header")?;
        for row in 0..self.rows {
            writer
                .write_record(
                    self.columns
                        .iter()
                        .map(|c| c.values[row].as_deref().unwrap_or("")),
                )
                .with_context(|| format!("write csv row {row}"))?;
        }
        writer.flush().context("flush csv writer")?;
        Ok(())
    }

    pub fn read_csv<R: Read>(input: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(input);
        let headers = reader.headers().context("read csv header")?.clone();
        let mut columns = headers
            .iter()
            .map(|name| Column {
                name: name.to_string(),
                values: Vec::new(),
            })
            .collect::<Vec<_>>();
        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("read csv row {row}"))?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.values.push(if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                });
            }
        }
        Self::from_columns(columns)
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let tmp = path.with_extension("csv.tmp");
        let file = fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        self.write_csv(file)?;
        fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
        Ok(())
    }

    pub fn read_csv_file(path: &Path) -> Result<Self> {
        let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        Self::read_csv(file).with_context(|| format!("parse {}", path.display()))
    }
}

#[derive(Debug, Default)]
pub struct WideTableAssembler {
    table: WideTable,
}

impl WideTableAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.table.rows
    }

    pub fn table(&self) -> &WideTable {
        &self.table
    }

    pub fn finish(self) -> WideTable {
        self.table
    }

    pub fn add_game<H, A, HK, AK>(&mut self, game_id: &str, home: H, away: A)
    where
        H: IntoIterator<Item = (HK, Cell)>,
        A: IntoIterator<Item = (AK, Cell)>,
        HK: AsRef<str>,
        AK: AsRef<str>,
    {
        let id = std::iter::once((ID_COLUMN.to_string(), Some(game_id.to_string())));
        let home = home
            .into_iter()
            .map(|(category, value)| (format!("home.{}", category.as_ref()), value));
        let away = away
            .into_iter()
            .map(|(category, value)| (format!("away.{}", category.as_ref()), value));
        self.add_record(id.chain(home).chain(away));
    }

    /// Unseen columns are backfilled with absent cells for every earlier row,
    /// known columns missing from `fields` get an absent cell. A column named
    /// twice keeps the last value.
    pub fn add_record<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (String, Cell)>,
    {
        let mut touched = vec![false; self.table.columns.len()];
        for (name, value) in fields {
            let idx = self.ensure_column(&name);
            if idx >= touched.len() {
                touched.resize(idx + 1, false);
            }
            let values = &mut self.table.columns[idx].values;
            if touched[idx] {
                if let Some(last) = values.last_mut() {
                    *last = value;
                }
            } else {
                values.push(value);
                touched[idx] = true;
            }
        }
        for (idx, column) in self.table.columns.iter_mut().enumerate() {
            if !touched.get(idx).copied().unwrap_or(false) {
                column.values.push(None);
            }
        }
        self.table.rows += 1;
    }

    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = self.table.index.get(name) {
            return *idx;
        }
        let idx = self.table.columns.len();
        self.table.columns.push(Column {
            name: name.to_string(),
            values: vec![None; self.table.rows],
        });
        self.table.index.insert(name.to_string(), idx);
        idx
    }
}
