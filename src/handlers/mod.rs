pub mod estimate;
pub mod models;
pub mod ops;
