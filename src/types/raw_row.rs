/// One data row of the portal's result table, as text.
///
/// All fields are trimmed and non-empty. `hour` uses the portal's 01:00–24:00
/// clock, where `24:00` is midnight of the following day, and `value` uses a
/// comma as decimal separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub day: String,
    pub hour: String,
    pub station_name: String,
    pub parameter_name: String,
    pub unit: String,
    pub value: String,
}
