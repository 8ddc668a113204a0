pub mod builder;
pub mod payload;
