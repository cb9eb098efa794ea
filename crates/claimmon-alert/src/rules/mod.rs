pub mod ai_cost;
pub mod emergency;
pub mod threshold;
