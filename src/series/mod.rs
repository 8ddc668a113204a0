pub mod error;
pub mod normalize;
pub mod reconcile;
pub mod retrieval;
