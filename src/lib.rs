pub mod cache;
pub mod config;
pub mod document;
pub mod features;
pub mod fetch;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod vehicle;
