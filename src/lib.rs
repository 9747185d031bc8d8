pub mod analyzers;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod payload;
pub mod publish;
pub mod record;
pub mod store;
