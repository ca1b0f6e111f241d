pub mod analytics;
pub mod fetch;
pub mod infra;
pub mod normalize;
pub mod output;
pub mod services;
