//! CSV text codec and the column layouts of the four importable entities
//!
//! Parsing keeps a header-keyed map per data row. Rows whose field count does
//! not match the header are dropped, the same as a spreadsheet export with a
//! stray trailing line. Writing quotes a field only when it holds a comma, a
//! double quote or a line break.

use std::collections::HashMap;

use csv::{QuoteStyle, ReaderBuilder, Terminator, Trim, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV write error: {0}")]
    Write(String),

    #[error("Unknown CSV entity: {0}")]
    UnknownEntity(String),
}

/// One data row keyed by header name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// Line number as a spreadsheet shows it; the first data row is 2
    pub number: usize,
    values: HashMap<String, String>,
}

impl CsvRow {
    pub fn new(number: usize, values: HashMap<String, String>) -> Self {
        Self { number, values }
    }

    /// First non-empty value among the column aliases, in the order given
    pub fn get(&self, aliases: &[&str]) -> Option<&str> {
        aliases
            .iter()
            .filter_map(|alias| self.values.get(*alias))
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    /// Text value, empty when absent
    pub fn text(&self, aliases: &[&str]) -> String {
        self.get(aliases).unwrap_or_default().to_string()
    }

    /// Text value with a fallback for absent or empty columns
    pub fn text_or(&self, aliases: &[&str], default: &str) -> String {
        self.get(aliases).unwrap_or(default).to_string()
    }

    /// Decimal number, `0` when absent or unparseable
    pub fn number(&self, aliases: &[&str]) -> f64 {
        self.get(aliases)
            .and_then(|value| value.replace(',', "").parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
    }

    /// Whole count, truncated toward zero and never negative
    pub fn count(&self, aliases: &[&str]) -> u32 {
        let value = self.number(aliases).trunc();
        if value <= 0.0 {
            0
        } else if value >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            value as u32
        }
    }

    /// Money amount, `0` when absent or unparseable
    pub fn money(&self, aliases: &[&str]) -> Decimal {
        self.get(aliases)
            .and_then(|value| value.replace(',', "").parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn is_present(&self, aliases: &[&str]) -> bool {
        self.get(aliases).is_some()
    }
}

/// Parse CSV text into header-keyed rows
pub fn parse_csv(text: &str) -> Result<Vec<CsvRow>, CsvError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != headers.len() {
            continue;
        }
        let values = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(CsvRow::new(rows.len() + 2, values));
    }
    Ok(rows)
}

/// Serialise rows under a header line
///
/// No rows gives an empty string. Lines are joined with `\n` and there is no
/// trailing line break.
pub fn to_csv<R, F>(headers: &[&str], rows: R) -> Result<String, CsvError>
where
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<[u8]>,
{
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Write(e.to_string()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| CsvError::Write(e.to_string()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Column aliases; the spreadsheet header comes first, then the record field name
pub mod columns {
    pub const DATE: &[&str] = &["Date", "date"];
    pub const CYCLE: &[&str] = &["Cycle", "cycleId"];
    pub const CAGE: &[&str] = &["Cage", "cageId"];
    pub const NOTES: &[&str] = &["Notes", "notes"];
    pub const PAYMENT_METHOD: &[&str] = &["Payment_Method", "paymentMethod"];

    pub const FLOCK_AGE: &[&str] = &["Flock_Age_Days", "flockAgeDays", "flockAge"];
    pub const OPENING_BIRDS: &[&str] = &["Opening_Birds", "openingBirds"];
    pub const MORTALITY: &[&str] = &["Mortality", "mortality"];
    pub const BIRDS_SOLD: &[&str] = &["Birds_Sold", "birdsSold"];
    pub const EGGS_PRODUCED: &[&str] = &["Eggs_Produced", "eggsProduced"];
    pub const EGGS_TRAYS: &[&str] = &["Eggs_Trays", "eggsTrays"];
    pub const CLOSING_BIRDS: &[&str] = &["Closing_Birds", "closingBirds"];
    pub const CURRENT_FEED: &[&str] = &["Current_Feed_Kg", "currentFeed"];

    pub const SALE_TYPE: &[&str] = &["Sale_Type", "saleType"];
    pub const CUSTOMER: &[&str] = &["Customer", "customer"];
    pub const CRATES: &[&str] = &["Crates", "crates"];
    pub const PRICE_PER_CRATE: &[&str] = &["Price_Per_Crate", "pricePerCrate"];
    pub const BIRD_QUANTITY: &[&str] = &["Bird_Quantity", "birdQuantity"];
    pub const PRICE_PER_BIRD: &[&str] = &["Price_Per_Bird", "pricePerBird"];
    pub const WEIGHT_KG: &[&str] = &["Weight_Kg", "weight"];
    pub const TOTAL_AMOUNT: &[&str] = &["Total_Amount", "amount"];

    pub const CATEGORY: &[&str] = &["Category", "category"];
    pub const DESCRIPTION: &[&str] = &["Description", "description"];
    pub const AMOUNT: &[&str] = &["Amount", "amount"];

    pub const FEED_CONSUMED: &[&str] = &["Feed_Consumed_Kg", "feedConsumed", "amount"];
    pub const FEED_COST: &[&str] = &["Feed_Cost", "feedCost", "cost"];
}

/// Entities that travel as CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    ProductionLogs,
    Sales,
    Expenses,
    FeedLogs,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::ProductionLogs,
        EntityKind::Sales,
        EntityKind::Expenses,
        EntityKind::FeedLogs,
    ];

    /// Header row, in export order
    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            EntityKind::ProductionLogs => &[
                "Date",
                "Cycle",
                "Cage",
                "Flock_Age_Days",
                "Opening_Birds",
                "Mortality",
                "Birds_Sold",
                "Eggs_Produced",
                "Closing_Birds",
                "Production_Percentage",
                "Notes",
            ],
            EntityKind::Sales => &[
                "Date",
                "Cycle",
                "Sale_Type",
                "Customer",
                "Crates",
                "Price_Per_Crate",
                "Bird_Quantity",
                "Price_Per_Bird",
                "Weight_Kg",
                "Total_Amount",
                "Payment_Method",
                "Notes",
            ],
            EntityKind::Expenses => &[
                "Date",
                "Cycle",
                "Category",
                "Description",
                "Amount",
                "Payment_Method",
                "Notes",
            ],
            EntityKind::FeedLogs => &["Date", "Cycle", "Feed_Consumed_Kg", "Feed_Cost", "Notes"],
        }
    }

    fn sample_row(&self) -> &'static [&'static str] {
        match self {
            EntityKind::ProductionLogs => &[
                "2025-07-21",
                "Cycle 1",
                "Cage A1",
                "150",
                "100",
                "1",
                "0",
                "85",
                "99",
                "85.0",
                "Normal production day",
            ],
            EntityKind::Sales => &[
                "2025-07-21",
                "Cycle 1",
                "egg",
                "Local Market",
                "10",
                "40.00",
                "",
                "",
                "",
                "400.00",
                "cash",
                "Weekly egg sale",
            ],
            EntityKind::Expenses => &[
                "2025-07-21",
                "Cycle 1",
                "feed",
                "Layer feed 50kg",
                "150.00",
                "cash",
                "Weekly feed purchase",
            ],
            EntityKind::FeedLogs => &["2025-07-21", "Cycle 1", "25.5", "85.00", "Daily feed consumption"],
        }
    }

    /// Import template: header line and one sample row
    pub fn template(&self) -> String {
        format!("{}\n{}", self.headers().join(","), self.sample_row().join(","))
    }

    /// File name stem used by exports and templates
    pub fn file_stem(&self) -> &'static str {
        match self {
            EntityKind::ProductionLogs => "production-logs",
            EntityKind::Sales => "sales",
            EntityKind::Expenses => "expenses",
            EntityKind::FeedLogs => "feed-logs",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "production" | "production-logs" | "productionlogs" => Ok(EntityKind::ProductionLogs),
            "sales" | "sale" => Ok(EntityKind::Sales),
            "expenses" | "expense" => Ok(EntityKind::Expenses),
            "feed" | "feed-logs" | "feedlogs" => Ok(EntityKind::FeedLogs),
            _ => Err(CsvError::UnknownEntity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quoted_comma_is_one_field() {
        let rows = parse_csv("Customer,Amount\n\"Smith, John\",400").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(&["Customer"]), Some("Smith, John"));
        assert_eq!(rows[0].get(&["Amount"]), Some("400"));
    }

    #[test]
    fn test_escaped_quotes_and_newlines() {
        let text = "Notes,Cage\n\"He said \"\"hi\"\"\",A1\n\"two\nlines\",A2";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text(columns::NOTES), "He said \"hi\"");
        assert_eq!(rows[1].text(columns::NOTES), "two\nlines");
        assert_eq!(rows[1].number, 3);
    }

    #[test]
    fn test_mismatched_rows_are_dropped() {
        let rows = parse_csv("Date,Cycle\n2025-07-21,Cycle 1\n2025-07-22\n2025-07-23,Cycle 1,extra\n2025-07-24,Cycle 2").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].text(columns::CYCLE), "Cycle 2");
        // Numbered over kept rows
        assert_eq!(rows[1].number, 3);
    }

    #[test]
    fn test_header_only() {
        assert!(parse_csv("Date,Cycle\n").unwrap().is_empty());
        assert!(parse_csv("").unwrap().is_empty());
    }

    #[test]
    fn test_alias_order_and_defaults() {
        let rows = parse_csv("Opening_Birds,openingBirds,Mortality,Crates\n,120,abc,-3.7").unwrap();
        let row = &rows[0];
        // Empty human column falls through to the machine key
        assert_eq!(row.count(columns::OPENING_BIRDS), 120);
        assert_eq!(row.count(columns::MORTALITY), 0);
        assert_eq!(row.count(columns::CRATES), 0);
        assert_eq!(row.number(columns::CRATES), -3.7);
        assert_eq!(row.text_or(columns::PAYMENT_METHOD, "cash"), "cash");
    }

    #[test]
    fn test_to_csv_quoting() {
        let text = to_csv(
            &["Customer", "Notes"],
            vec![vec!["Smith, John", "said \"ok\""], vec!["Plain", "two\nlines"]],
        )
        .unwrap();
        assert_eq!(
            text,
            "Customer,Notes\n\"Smith, John\",\"said \"\"ok\"\"\"\nPlain,\"two\nlines\""
        );
    }

    #[test]
    fn test_to_csv_empty() {
        assert_eq!(to_csv(&["Date"], Vec::<Vec<String>>::new()).unwrap(), "");
    }

    #[test]
    fn test_templates_parse_back() {
        for kind in EntityKind::ALL {
            let rows = parse_csv(&kind.template()).unwrap();
            assert_eq!(rows.len(), 1, "{kind}");
            assert_eq!(rows[0].text(columns::DATE), "2025-07-21");
            assert_eq!(rows[0].text(columns::CYCLE), "Cycle 1");
        }
    }

    #[test]
    fn test_entity_kind_parse() {
        assert_eq!("production".parse::<EntityKind>().unwrap(), EntityKind::ProductionLogs);
        assert_eq!("feed_logs".parse::<EntityKind>().unwrap(), EntityKind::FeedLogs);
        assert!("cages".parse::<EntityKind>().is_err());
    }

    proptest! {
        #[test]
        fn prop_round_trip_plain_fields(
            rows in prop::collection::vec(prop::collection::vec("[A-Za-z0-9._-]{1,12}", 3), 1..20)
        ) {
            let headers = ["first", "second", "third"];
            let text = to_csv(&headers, rows.clone()).unwrap();
            let parsed = parse_csv(&text).unwrap();

            prop_assert_eq!(parsed.len(), rows.len());
            for (row, original) in parsed.iter().zip(rows.iter()) {
                for (header, value) in headers.iter().zip(original.iter()) {
                    prop_assert_eq!(row.get(&[*header]), Some(value.as_str()));
                }
            }
        }

        #[test]
        fn prop_round_trip_special_fields(
            values in prop::collection::vec("[a-z]{1,6}[,\"\n][a-z]{1,6}", 1..10)
        ) {
            let rows: Vec<Vec<String>> = values.iter().map(|v| vec![v.clone(), "x".to_string()]).collect();
            let text = to_csv(&["value", "tail"], rows).unwrap();
            let parsed = parse_csv(&text).unwrap();

            prop_assert_eq!(parsed.len(), values.len());
            for (row, value) in parsed.iter().zip(values.iter()) {
                prop_assert_eq!(row.get(&["value"]), Some(value.as_str()));
            }
        }
    }
}
