//! Typed form body of the Qualar export query.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Date format the portal expects in its query form.
pub const PORTAL_DATE_FORMAT: &str = "%d/%m/%Y";

/// Monitoring network selector (`irede`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Network {
    /// Automatic stations.
    #[serde(rename = "A")]
    Automatic,
}

/// Kind of data requested (`iTipoDado`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataKind {
    /// Point (hourly) data.
    #[serde(rename = "P")]
    Point,
}

/// Form payload for one (station, parameter, date range) query.
///
/// Field names are mapped to the portal's form names only when the struct is
/// serialised by the HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryPayload {
    #[serde(rename = "irede")]
    pub network: Network,
    #[serde(rename = "dataInicialStr", serialize_with = "portal_date")]
    pub start_date: NaiveDate,
    #[serde(rename = "dataFinalStr", serialize_with = "portal_date")]
    pub end_date: NaiveDate,
    #[serde(rename = "iTipoDado")]
    pub data_kind: DataKind,
    #[serde(rename = "estacaoVO.nestcaMonto")]
    pub station_id: u32,
    #[serde(rename = "parametroVO.nparmt")]
    pub parameter_id: u32,
}

fn portal_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(PORTAL_DATE_FORMAT))
}
