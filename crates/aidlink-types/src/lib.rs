pub mod api;
pub mod events;
pub mod models;

/// Currency amounts are whole rupees.
pub type Amount = i64;
