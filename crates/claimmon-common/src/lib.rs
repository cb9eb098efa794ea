pub mod health;
pub mod id;
pub mod types;
