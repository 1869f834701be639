//! Sales dashboard core for the Online Retail transactions dataset.

pub mod config;
pub mod data;
