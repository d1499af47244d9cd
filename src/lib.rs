pub mod branch;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod filter;
pub mod history;
pub mod model;
pub mod page;
pub mod query;
pub mod sort;
pub mod tags;
