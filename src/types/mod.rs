pub mod measurement;
pub mod raw_row;
