pub mod analyze;
pub mod cache;
pub mod health;
pub mod retrieval;
