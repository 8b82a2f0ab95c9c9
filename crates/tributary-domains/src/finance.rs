//! Finance domain: market ticks stored as CSV, summarized per symbol

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Float64Type, Int64Type, Schema, SchemaRef};
use arrow::error::ArrowError;
use rand::Rng;

use tributary_core::codec::{optional_str, primitive_column, required, required_str, string_column};
use tributary_core::{CodecError, Columnar};
use tributary_warehouse::{Column, SqlType, TableRow, Value};

use crate::aggregate::{Groups, Mean, fail_closed, finite};
use crate::error::TransformError;
use crate::synth::{pick, round_to};

pub const SYMBOLS: [&str; 4] = ["AAPL", "GOOGL", "AMZN", "MSFT"];

const FIELDS: [&str; 10] = [
    "timestamp",
    "symbol",
    "open_price",
    "high_price",
    "low_price",
    "close_price",
    "volume",
    "market_cap",
    "pe_ratio",
    "dividend_yield",
];

/// One generated market tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceTick {
    pub timestamp: f64,
    pub symbol: String,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: i64,
    pub market_cap: f64,
    pub pe_ratio: f64,
    pub dividend_yield: f64,
}

impl FinanceTick {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, timestamp: f64) -> Self {
        let open_price = round_to(rng.random_range(100.0..2000.0), 2);
        let high_price = round_to(open_price * rng.random_range(1.01..1.05), 2);
        let low_price = round_to(open_price * rng.random_range(0.95..0.99), 2);
        let close_price = round_to(rng.random_range(low_price..=high_price), 2);
        let volume: i64 = rng.random_range(1_000_000..=10_000_000);
        Self {
            timestamp,
            symbol: pick(rng, &SYMBOLS).to_string(),
            open_price,
            high_price,
            low_price,
            close_price,
            volume,
            market_cap: round_to(volume as f64 * close_price, 2),
            pe_ratio: round_to(rng.random_range(10.0..50.0), 2),
            dividend_yield: round_to(rng.random_range(0.0..0.05), 4),
        }
    }
}

impl Columnar for FinanceTick {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("timestamp", DataType::Float64, false),
            Field::new("symbol", DataType::Utf8, false),
            Field::new("open_price", DataType::Float64, false),
            Field::new("high_price", DataType::Float64, false),
            Field::new("low_price", DataType::Float64, false),
            Field::new("close_price", DataType::Float64, false),
            Field::new("volume", DataType::Int64, false),
            Field::new("market_cap", DataType::Float64, false),
            Field::new("pe_ratio", DataType::Float64, false),
            Field::new("dividend_yield", DataType::Float64, false),
        ]))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        let f64_col = |f: fn(&Self) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from_iter_values(records.iter().map(f)))
        };
        let columns: Vec<ArrayRef> = vec![
            f64_col(|r| r.timestamp),
            Arc::new(StringArray::from_iter_values(records.iter().map(|r| &r.symbol))),
            f64_col(|r| r.open_price),
            f64_col(|r| r.high_price),
            f64_col(|r| r.low_price),
            f64_col(|r| r.close_price),
            Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.volume))),
            f64_col(|r| r.market_cap),
            f64_col(|r| r.pe_ratio),
            f64_col(|r| r.dividend_yield),
        ];
        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, CodecError> {
        let f = |name| primitive_column::<Float64Type>(batch, name);
        let (timestamp, open, high, low, close, cap, pe, dividend) = (
            f("timestamp")?,
            f("open_price")?,
            f("high_price")?,
            f("low_price")?,
            f("close_price")?,
            f("market_cap")?,
            f("pe_ratio")?,
            f("dividend_yield")?,
        );
        let symbol = string_column(batch, "symbol")?;
        let volume = primitive_column::<Int64Type>(batch, "volume")?;

        (0..batch.num_rows())
            .map(|i| {
                Ok(Self {
                    timestamp: required(timestamp, i, "timestamp")?,
                    symbol: required_str(symbol, i, "symbol")?,
                    open_price: required(open, i, "open_price")?,
                    high_price: required(high, i, "high_price")?,
                    low_price: required(low, i, "low_price")?,
                    close_price: required(close, i, "close_price")?,
                    volume: required(volume, i, "volume")?,
                    market_cap: required(cap, i, "market_cap")?,
                    pe_ratio: required(pe, i, "pe_ratio")?,
                    dividend_yield: required(dividend, i, "dividend_yield")?,
                })
            })
            .collect()
    }
}

/// A finance CSV row as read back by the consumer: every cell is raw text,
/// coerced by [`transform`] rather than by the codec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinanceRow {
    pub timestamp: Option<String>,
    pub symbol: Option<String>,
    pub open_price: Option<String>,
    pub high_price: Option<String>,
    pub low_price: Option<String>,
    pub close_price: Option<String>,
    pub volume: Option<String>,
    pub market_cap: Option<String>,
    pub pe_ratio: Option<String>,
    pub dividend_yield: Option<String>,
}

impl FinanceRow {
    fn cells(&self) -> [&Option<String>; 10] {
        [
            &self.timestamp,
            &self.symbol,
            &self.open_price,
            &self.high_price,
            &self.low_price,
            &self.close_price,
            &self.volume,
            &self.market_cap,
            &self.pe_ratio,
            &self.dividend_yield,
        ]
    }
}

impl From<&FinanceTick> for FinanceRow {
    fn from(t: &FinanceTick) -> Self {
        Self {
            timestamp: Some(t.timestamp.to_string()),
            symbol: Some(t.symbol.clone()),
            open_price: Some(t.open_price.to_string()),
            high_price: Some(t.high_price.to_string()),
            low_price: Some(t.low_price.to_string()),
            close_price: Some(t.close_price.to_string()),
            volume: Some(t.volume.to_string()),
            market_cap: Some(t.market_cap.to_string()),
            pe_ratio: Some(t.pe_ratio.to_string()),
            dividend_yield: Some(t.dividend_yield.to_string()),
        }
    }
}

impl Columnar for FinanceRow {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(
            FIELDS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        ))
    }

    fn to_batch(records: &[Self]) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = (0..FIELDS.len())
            .map(|col| -> ArrayRef {
                Arc::new(StringArray::from_iter(
                    records.iter().map(|r| r.cells()[col].as_deref()),
                ))
            })
            .collect();
        RecordBatch::try_new(Self::schema(), columns)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, CodecError> {
        let cols = FIELDS
            .iter()
            .map(|name| string_column(batch, name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((0..batch.num_rows())
            .map(|i| {
                let cell = |c: usize| optional_str(cols[c], i);
                Self {
                    timestamp: cell(0),
                    symbol: cell(1),
                    open_price: cell(2),
                    high_price: cell(3),
                    low_price: cell(4),
                    close_price: cell(5),
                    volume: cell(6),
                    market_cap: cell(7),
                    pe_ratio: cell(8),
                    dividend_yield: cell(9),
                }
            })
            .collect())
    }
}

/// Parse a cell as a number. Blank, unparsable, NaN and infinite cells are
/// missing.
pub fn coerce(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Per-symbol finance aggregate, keyed by `symbol`.
#[derive(Debug, Clone, PartialEq)]
pub struct FinanceSummary {
    pub symbol: String,
    pub avg_close_price: f64,
    pub total_market_cap: f64,
    pub avg_pe_ratio: f64,
    pub avg_dividend_yield: f64,
}

impl TableRow for FinanceSummary {
    const TABLE: &'static str = "finance_data";
    const CONFLICT_KEY: &'static str = "symbol";

    fn columns() -> Vec<Column> {
        vec![
            Column::new("symbol", SqlType::Text),
            Column::new("avg_close_price", SqlType::Double),
            Column::new("total_market_cap", SqlType::Double),
            Column::new("avg_pe_ratio", SqlType::Double),
            Column::new("avg_dividend_yield", SqlType::Double),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.symbol.as_str().into(),
            self.avg_close_price.into(),
            self.total_market_cap.into(),
            self.avg_pe_ratio.into(),
            self.avg_dividend_yield.into(),
        ]
    }
}

#[derive(Default)]
struct SymbolAcc {
    close: Mean,
    market_cap: Mean,
    pe: Mean,
    dividend: Mean,
}

/// Clean and aggregate finance rows.
///
/// A row is dropped if any of `close_price`, `market_cap`, `pe_ratio` or
/// `dividend_yield` does not coerce to a number, or if it has no symbol.
/// Returns no rows (and logs) if any aggregate overflows.
pub fn transform(rows: &[FinanceRow]) -> Vec<FinanceSummary> {
    fail_closed("finance", try_transform(rows))
}

pub fn try_transform(rows: &[FinanceRow]) -> Result<Vec<FinanceSummary>, TransformError> {
    let mut groups: Groups<SymbolAcc> = Groups::new();
    let mut dropped = 0usize;

    for row in rows {
        let cleaned = (
            row.symbol.as_deref().filter(|s| !s.is_empty()),
            coerce(row.close_price.as_deref()),
            coerce(row.market_cap.as_deref()),
            coerce(row.pe_ratio.as_deref()),
            coerce(row.dividend_yield.as_deref()),
        );
        let (Some(symbol), Some(close), Some(cap), Some(pe), Some(dividend)) = cleaned else {
            dropped += 1;
            continue;
        };
        let acc = groups.entry(symbol);
        acc.close.add(close);
        acc.market_cap.add(cap);
        acc.pe.add(pe);
        acc.dividend.add(dividend);
    }

    if dropped > 0 {
        log::debug!("finance: dropped {dropped} rows with missing or non-numeric fields");
    }

    groups
        .into_entries()
        .into_iter()
        .map(|(symbol, acc)| {
            Ok(FinanceSummary {
                avg_close_price: finite(&symbol, "avg_close_price", acc.close.mean())?,
                total_market_cap: finite(&symbol, "total_market_cap", acc.market_cap.sum())?,
                avg_pe_ratio: finite(&symbol, "avg_pe_ratio", acc.pe.mean())?,
                avg_dividend_yield: finite(&symbol, "avg_dividend_yield", acc.dividend.mean())?,
                symbol,
            })
        })
        .collect()
}
