//! Queries the export endpoint and extracts the rows of its result table.

use crate::query::builder::QueryKey;
use crate::session::error::PortalError;
use crate::session::Session;
use crate::types::raw_row::RawRow;
use log::{debug, info, warn};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

pub(crate) const QUERY_PATH: &str = "/qualar/exportaDados.do?method=pesquisar";

/// Rows before the first data row (title and column headers).
const HEADER_ROWS: usize = 2;
/// A table with fewer valid data rows than this is treated as "no data".
const MIN_DATA_ROWS: usize = 2;

const DAY_CELL: usize = 3;
const HOUR_CELL: usize = 4;
const STATION_CELL: usize = 6;
const PARAMETER_CELL: usize = 7;
const UNIT_CELL: usize = 8;
const VALUE_CELL: usize = 9;

static RESULT_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table#tbl").expect("result table selector is valid"));
static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("row selector is valid"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("cell selector is valid"));

/// Result of one scrape.
///
/// `Empty` covers a missing result table, a table with fewer than two valid data
/// rows, and a silently rejected login; none of them is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Data(Vec<RawRow>),
    Empty,
}

impl ScrapeOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, ScrapeOutcome::Empty)
    }

    pub fn rows(&self) -> &[RawRow] {
        match self {
            ScrapeOutcome::Data(rows) => rows,
            ScrapeOutcome::Empty => &[],
        }
    }

    pub fn into_rows(self) -> Vec<RawRow> {
        match self {
            ScrapeOutcome::Data(rows) => rows,
            ScrapeOutcome::Empty => Vec::new(),
        }
    }
}

/// Submits the query for `key` inside `session` and parses the response.
///
/// # Errors
///
/// Only transport failures are errors. Anything the portal sends back is parsed,
/// and a page without usable rows yields [`ScrapeOutcome::Empty`].
pub async fn scrape(session: &Session, key: &QueryKey) -> Result<ScrapeOutcome, PortalError> {
    debug!("Querying {}", key);
    let body = session.post_form(QUERY_PATH, &key.payload()).await?;

    let outcome = parse_table(&body);
    match &outcome {
        ScrapeOutcome::Data(rows) => info!("Scraped {} rows for {}", rows.len(), key),
        ScrapeOutcome::Empty => warn!("No data for {}", key),
    }
    Ok(outcome)
}

/// Extracts the data rows of the `tbl` table from a result page.
///
/// The first two rows are headers. From each remaining row the cells at
/// positions 3, 4, 6, 7, 8 and 9 are read as day, hour, station name, parameter
/// name, unit and value. Rows missing any of them, or with one of them blank
/// after trimming, are dropped.
pub fn parse_table(html: &str) -> ScrapeOutcome {
    let document = Html::parse_document(html);

    let Some(table) = document.select(&RESULT_TABLE).next() else {
        debug!("Result table not found in response");
        return ScrapeOutcome::Empty;
    };

    let rows: Vec<RawRow> = table
        .select(&ROW)
        .skip(HEADER_ROWS)
        .filter_map(extract_row)
        .collect();

    if rows.len() < MIN_DATA_ROWS {
        debug!("Result table has {} usable rows", rows.len());
        return ScrapeOutcome::Empty;
    }
    ScrapeOutcome::Data(rows)
}

fn extract_row(row: ElementRef<'_>) -> Option<RawRow> {
    let cells: Vec<String> = row
        .select(&CELL)
        .map(|cell| cell.text().collect::<String>().trim().to_string())
        .collect();

    let cell = |idx: usize| cells.get(idx).filter(|text| !text.is_empty()).cloned();

    Some(RawRow {
        day: cell(DAY_CELL)?,
        hour: cell(HOUR_CELL)?,
        station_name: cell(STATION_CELL)?,
        parameter_name: cell(PARAMETER_CELL)?,
        unit: cell(UNIT_CELL)?,
        value: cell(VALUE_CELL)?,
    })
}
