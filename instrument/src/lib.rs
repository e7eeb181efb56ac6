//! Collects structured simulation events into column tables.
//!
//! A `tracing` subscriber turns every info-level event into one row of the
//! table named after the event's target. Columns appear the first time a field
//! is seen; rows that lack a field get a zero value for it.
//!
//! ```ignore
//! // In simulation code:
//! tracing::info!(target: "purchase", tick, person_id, price);
//!
//! // In a test:
//! let log = tracing::subscriber::with_default(instrument::TableSubscriber, || {
//!     world.run_ticks(10).unwrap();
//!     instrument::drain()
//! });
//! let purchases = log.table("purchase").unwrap();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::{Event, Id, Metadata, Subscriber};

// === COLUMNS & TABLES ===

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::U64(v) => v.len(),
            Column::I64(v) => v.len(),
            Column::F64(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill with zero values up to `rows`.
    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        match self {
            Column::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Column::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            Column::F64(v) => v.extend(std::iter::repeat_n(0.0, missing)),
            Column::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            Column::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }
}

/// Rows of one event target.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: HashMap<String, Column>,
    rows: usize,
}

impl Table {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn u64s(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            Column::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn f64s(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            Column::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn strs(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            Column::Str(v) => Some(v),
            _ => None,
        }
    }

    fn pad_all(&mut self) {
        let rows = self.rows;
        self.columns.values_mut().for_each(|c| c.pad_to(rows));
    }

    /// Column for `name`, created zero-filled for earlier rows if new.
    fn column_mut(&mut self, name: &str, empty: fn(usize) -> Column) -> &mut Column {
        let rows = self.rows;
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| empty(rows))
    }

    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| match col {
                Column::U64(v) => polars::prelude::Column::new(name.into(), v),
                Column::I64(v) => polars::prelude::Column::new(name.into(), v),
                Column::F64(v) => polars::prelude::Column::new(name.into(), v),
                Column::Bool(v) => polars::prelude::Column::new(name.into(), v),
                Column::Str(v) => polars::prelude::Column::new(name.into(), v),
            })
            .collect();
        DataFrame::new(columns)
    }
}

/// All tables, keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub tables: HashMap<String, Table>,
}

impl EventLog {
    pub fn table(&self, target: &str) -> Option<&Table> {
        self.tables.get(target)
    }

    /// Row count for a target, zero when nothing was recorded.
    pub fn rows(&self, target: &str) -> usize {
        self.table(target).map(Table::rows).unwrap_or(0)
    }

    pub fn to_dataframes(&self) -> HashMap<String, DataFrame> {
        self.tables
            .iter()
            .filter_map(|(name, table)| table.to_dataframe().ok().map(|df| (name.clone(), df)))
            .collect()
    }
}

thread_local! {
    static LOG: RefCell<EventLog> = RefCell::default();
}

// === SUBSCRIBER ===

struct RowVisitor<'a> {
    table: &'a mut Table,
}

impl Visit for RowVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let Column::U64(v) = self.table.column_mut(field.name(), |n| Column::U64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Column::I64(v) = self.table.column_mut(field.name(), |n| Column::I64(vec![0; n])) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Column::F64(v) = self.table.column_mut(field.name(), |n| Column::F64(vec![0.0; n])) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let Column::Bool(v) =
            self.table.column_mut(field.name(), |n| Column::Bool(vec![false; n]))
        {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let Column::Str(v) = self
            .table
            .column_mut(field.name(), |n| Column::Str(vec![String::new(); n]))
        {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record_str(field, &format!("{:?}", value));
    }
}

/// Subscriber that appends info-level events to the thread-local `EventLog`.
/// Spans are ignored.
pub struct TableSubscriber;

impl Subscriber for TableSubscriber {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event() && *metadata.level() <= tracing::Level::INFO
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        LOG.with(|log| {
            let mut log = log.borrow_mut();
            let table = log
                .tables
                .entry(event.metadata().target().to_string())
                .or_default();

            table.pad_all();
            event.record(&mut RowVisitor { table: &mut *table });
            table.rows += 1;
            table.pad_all();
        });
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Install `TableSubscriber` as the global default. Later calls are no-ops.
pub fn install() {
    let _ = tracing::subscriber::set_global_default(TableSubscriber);
}

/// Take everything recorded on this thread so far.
pub fn drain() -> EventLog {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

pub fn clear() {
    LOG.with(|log| *log.borrow_mut() = EventLog::default());
}

// === PARQUET OUTPUT ===

/// Write each frame to `{dir}/{name}.parquet`.
pub fn save_parquet(dfs: &mut HashMap<String, DataFrame>, dir: &Path) -> PolarsResult<()> {
    let io_err = |e: std::io::Error| PolarsError::IO {
        error: e.into(),
        msg: None,
    };
    std::fs::create_dir_all(dir).map_err(io_err)?;
    for (name, df) in dfs.iter_mut() {
        let file = std::fs::File::create(dir.join(format!("{name}.parquet"))).map_err(io_err)?;
        ParquetWriter::new(file).finish(df)?;
    }
    Ok(())
}

/// Records a simulation run and writes it as parquet when dropped.
///
/// Clears this thread's log and installs the global subscriber on creation.
/// Output lands in `{parent}/{name}/`, followed by an empty `_ready` file once
/// every table is written.
pub struct ScopedRecorder {
    run_dir: PathBuf,
    dfs: Option<HashMap<String, DataFrame>>,
}

impl ScopedRecorder {
    pub fn new(parent: impl Into<PathBuf>, name: &str) -> Self {
        let name: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        clear();
        install();
        Self {
            run_dir: parent.into().join(name),
            dfs: None,
        }
    }

    /// Drain once, then keep returning the same frames.
    pub fn get(&mut self) -> &HashMap<String, DataFrame> {
        self.dfs.get_or_insert_with(|| drain().to_dataframes())
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl Drop for ScopedRecorder {
    fn drop(&mut self) {
        let mut dfs = self.dfs.take().unwrap_or_else(|| drain().to_dataframes());
        if dfs.is_empty() {
            return;
        }
        if let Err(e) = save_parquet(&mut dfs, &self.run_dir) {
            eprintln!("ScopedRecorder({}): failed to write parquet: {e}", self.run_dir.display());
            return;
        }
        if let Err(e) = std::fs::File::create(self.run_dir.join("_ready")) {
            eprintln!("ScopedRecorder({}): failed to write _ready: {e}", self.run_dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::subscriber::with_default;

    #[test]
    fn purchase_events_become_rows() {
        clear();
        with_default(TableSubscriber, || {
            tracing::info!(target: "purchase", tick = 1u64, price = 10.0f64, outcome = "bought");
            tracing::info!(target: "purchase", tick = 2u64, price = 0.0f64, outcome = "insufficient_funds");
            tracing::info!(target: "deposit", tick = 2u64, amount = 5.0f64);
        });
        let log = drain();

        let purchases = log.table("purchase").unwrap();
        assert_eq!(purchases.rows(), 2);
        assert_eq!(purchases.u64s("tick").unwrap(), &[1, 2]);
        assert_eq!(purchases.f64s("price").unwrap(), &[10.0, 0.0]);
        assert_eq!(purchases.strs("outcome").unwrap()[1], "insufficient_funds");
        assert_eq!(log.rows("deposit"), 1);
        assert_eq!(log.rows("tick"), 0);
    }

    #[test]
    fn late_and_missing_fields_are_zero_filled() {
        clear();
        with_default(TableSubscriber, || {
            tracing::info!(target: "t", tick = 1u64, wallet = 3.5f64);
            tracing::info!(target: "t", tick = 2u64, good = "A");
        });
        let log = drain();
        let t = log.table("t").unwrap();

        assert_eq!(t.rows(), 2);
        assert_eq!(t.f64s("wallet").unwrap(), &[3.5, 0.0]);
        assert_eq!(t.strs("good").unwrap(), &["".to_string(), "A".to_string()]);
        for name in t.column_names() {
            assert_eq!(t.column(name).unwrap().len(), 2, "column {name} misaligned");
        }
    }

    #[test]
    fn debug_level_is_ignored() {
        clear();
        with_default(TableSubscriber, || {
            tracing::debug!(target: "noise", tick = 1u64);
        });
        assert!(drain().table("noise").is_none());
    }

    #[test]
    fn converts_to_dataframe() {
        clear();
        with_default(TableSubscriber, || {
            for tick in 0..4u64 {
                tracing::info!(target: "tick", tick = tick, total_money = tick as f64 * 2.0);
            }
        });
        let dfs = drain().to_dataframes();
        let df = &dfs["tick"];
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 2);
    }
}
