//! Instrumentation for collecting auction runs into column-oriented tables.
//!
//! A custom `tracing` subscriber turns every info-level event into a table
//! row, keyed by the event target. Columns appear the first time a field is
//! seen and keep the order in which they first appeared, so a table written
//! to CSV has the same column layout as the events that produced it.
//!
//! # Usage
//!
//! ```ignore
//! // In mechanism code:
//! tracing::info!(target: "auction_step", step, kind = "price", category, price);
//!
//! // In a test or report writer:
//! let recorder = tracing::subscriber::with_default(instrument::DataFrameSubscriber, || {
//!     run_auction();
//!     instrument::drain()
//! });
//! let steps = recorder.table("auction_step");
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

/// A column of typed values.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pad_to(&mut self, rows: usize) {
        let padding = rows.saturating_sub(self.len());
        if padding == 0 {
            return;
        }
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, padding)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, padding)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(f64::NAN, padding)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, padding)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), padding)),
        }
    }
}

/// A table with dynamically-typed columns in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    pub columns: HashMap<String, TypedColumn>,
    pub column_order: Vec<String>,
    pub row_count: usize,
}

impl DynamicTable {
    pub fn column(&self, name: &str) -> Option<&TypedColumn> {
        self.columns.get(name)
    }

    /// Column names in the order they first appeared.
    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    /// Keep every column as long as the table.
    /// Rows that did not mention a field get 0, NaN, false or "".
    fn pad_columns_to_row_count(&mut self) {
        let rows = self.row_count;
        for col in self.columns.values_mut() {
            col.pad_to(rows);
        }
    }

    /// The column for `name`, created (and back-filled) with `empty` if new.
    fn column_or_insert(&mut self, name: &str, empty: impl FnOnce(usize) -> TypedColumn) -> &mut TypedColumn {
        if !self.columns.contains_key(name) {
            self.column_order.push(name.to_string());
        }
        let rows = self.row_count;
        self.columns.entry(name.to_string()).or_insert_with(|| {
            let mut col = empty(0);
            col.pad_to(rows);
            col
        })
    }
}

/// Collection of tables, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: HashMap<String, DynamicTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&DynamicTable> {
        self.tables.get(target)
    }
}

thread_local! {
    static RECORDER: RefCell<Recorder> = RefCell::default();
}

/// Visitor that appends one event's fields to the current row.
/// A value whose type differs from its column's is dropped; padding fills the gap.
struct ColumnVisitor<'a> {
    table: &'a mut DynamicTable,
}

impl Visit for ColumnVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let TypedColumn::U64(v) = self.table.column_or_insert(field.name(), |_| TypedColumn::U64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let TypedColumn::I64(v) = self.table.column_or_insert(field.name(), |_| TypedColumn::I64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let TypedColumn::F64(v) = self.table.column_or_insert(field.name(), |_| TypedColumn::F64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let TypedColumn::Bool(v) = self.table.column_or_insert(field.name(), |_| TypedColumn::Bool(Vec::new())) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let TypedColumn::Str(v) = self.table.column_or_insert(field.name(), |_| TypedColumn::Str(Vec::new())) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `message` and `%display` fields arrive here
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Tracing subscriber that collects events into column-oriented tables.
pub struct DataFrameSubscriber;

impl Subscriber for DataFrameSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();

        RECORDER.with(|r| {
            let mut recorder = r.borrow_mut();
            let table = recorder.tables.entry(target).or_default();

            table.pad_columns_to_row_count();
            event.record(&mut ColumnVisitor { table: &mut *table });
            table.row_count += 1;
            // Fields missing from this event
            table.pad_columns_to_row_count();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install the DataFrameSubscriber as the global default.
pub fn install_subscriber() {
    let _ = tracing::subscriber::set_global_default(DataFrameSubscriber);
}

/// Drain all recorded data from the thread-local recorder.
pub fn drain() -> Recorder {
    RECORDER.with(|r| std::mem::take(&mut *r.borrow_mut()))
}

/// Clear all recorded data without returning it.
pub fn clear() {
    RECORDER.with(|r| *r.borrow_mut() = Recorder::default());
}

// === Polars Integration ===

use polars::prelude::*;

impl DynamicTable {
    /// Convert this table to a polars DataFrame, columns in first-seen order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns: Vec<Column> = self
            .column_order
            .iter()
            .filter_map(|name| self.columns.get(name).map(|col| (name, col)))
            .map(|(name, col)| match col {
                TypedColumn::U64(v) => Column::new(name.into(), v),
                TypedColumn::I64(v) => Column::new(name.into(), v),
                TypedColumn::F64(v) => Column::new(name.into(), v),
                TypedColumn::Bool(v) => Column::new(name.into(), v),
                TypedColumn::Str(v) => Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

impl Recorder {
    /// Convert all tables to polars DataFrames.
    pub fn to_dataframes(&self) -> PolarsResult<HashMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }
}

/// Drain all recorded data and convert to polars DataFrames.
pub fn drain_to_dataframes() -> PolarsResult<HashMap<String, DataFrame>> {
    drain().to_dataframes()
}

/// File format for [`save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

fn io_error(e: std::io::Error) -> PolarsError {
    PolarsError::IO {
        error: e.into(),
        msg: None,
    }
}

/// Save every DataFrame as `{dir}/{name}.{ext}`, creating `dir` if needed.
pub fn save(dfs: &mut HashMap<String, DataFrame>, dir: &Path, format: OutputFormat) -> PolarsResult<()> {
    std::fs::create_dir_all(dir).map_err(io_error)?;
    for (name, df) in dfs.iter_mut() {
        let path = dir.join(format!("{}.{}", name, format.extension()));
        let mut file = std::fs::File::create(&path).map_err(io_error)?;
        match format {
            OutputFormat::Csv => CsvWriter::new(&mut file).include_header(true).finish(df)?,
            OutputFormat::Parquet => {
                ParquetWriter::new(file).finish(df)?;
            }
        }
    }
    Ok(())
}

pub fn save_csv(dfs: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    save(dfs, dir, OutputFormat::Csv)
}

pub fn save_parquet(dfs: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    save(dfs, dir, OutputFormat::Parquet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn test_column_padding() {
        let mut table = DynamicTable::default();

        // Row 1: step and price
        if let TypedColumn::U64(v) = table.column_or_insert("step", |_| TypedColumn::U64(Vec::new())) {
            v.push(1);
        }
        if let TypedColumn::F64(v) = table.column_or_insert("price", |_| TypedColumn::F64(Vec::new())) {
            v.push(-4.0);
        }
        table.row_count = 1;

        // Row 2: step and a new "removed" column, no price
        table.pad_columns_to_row_count();
        if let TypedColumn::U64(v) = table.column_or_insert("step", |_| TypedColumn::U64(Vec::new())) {
            v.push(2);
        }
        if let TypedColumn::F64(v) = table.column_or_insert("removed", |_| TypedColumn::F64(Vec::new())) {
            v.push(-3.0);
        }
        table.row_count = 2;
        table.pad_columns_to_row_count();

        assert_eq!(table.column_names(), &["step", "price", "removed"]);
        for name in table.column_names() {
            assert_eq!(table.columns[name].len(), 2, "{name} should have 2 values");
        }
        if let Some(TypedColumn::F64(prices)) = table.column("price") {
            assert!(prices[1].is_nan(), "missing price should be padded with NaN");
        } else {
            panic!("price should be F64 column");
        }
        if let Some(TypedColumn::F64(removed)) = table.column("removed") {
            assert!(removed[0].is_nan());
            assert_eq!(removed[1], -3.0);
        } else {
            panic!("removed should be F64 column");
        }
    }

    #[test]
    fn test_tracing_integration() {
        clear();

        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "auction_step", step = 1u64, kind = "price", price = -4.0f64);
            tracing::info!(target: "auction_step", step = 2u64, kind = "removed", value = -3.0f64);
            tracing::info!(target: "auction_step", step = 3u64, kind = "zero_sum");
            tracing::debug!(target: "auction_step", step = 4u64);
        });

        let recorder = drain();
        let table = recorder.table("auction_step").expect("auction_step table should exist");
        assert_eq!(table.row_count, 3, "debug events are not recorded");
        assert_eq!(table.column_names(), &["step", "kind", "price", "value"]);

        if let Some(TypedColumn::U64(steps)) = table.column("step") {
            assert_eq!(steps, &vec![1, 2, 3]);
        } else {
            panic!("step should be U64 column");
        }
        if let Some(TypedColumn::Str(kinds)) = table.column("kind") {
            assert_eq!(kinds, &vec!["price", "removed", "zero_sum"]);
        } else {
            panic!("kind should be Str column");
        }
    }

    #[test]
    fn test_dataframe_keeps_column_order() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "experiment", auction_name = "ascending", num_of_agents = 10u64, gft_ratio = 87.5f64);
            tracing::info!(target: "experiment", auction_name = "mcafee", num_of_agents = 10u64, gft_ratio = 75.0f64);
        });

        let dfs = drain_to_dataframes().unwrap();
        let df = &dfs["experiment"];
        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df.get_column_names().into_iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["auction_name", "num_of_agents", "gft_ratio"]);
    }

    #[test]
    fn test_save_csv() {
        clear();
        with_default(DataFrameSubscriber, || {
            tracing::info!(target: "experiment", num_of_agents = 10u64, gft_ratio = 87.5f64);
        });
        let mut dfs = drain_to_dataframes().unwrap();

        let dir = std::env::temp_dir().join(format!("instrument_csv_{}", std::process::id()));
        save_csv(&mut dfs, &dir).unwrap();
        let text = std::fs::read_to_string(dir.join("experiment.csv")).unwrap();
        assert!(text.starts_with("num_of_agents,gft_ratio"), "{text}");
        assert!(text.contains("10,87.5"), "{text}");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
