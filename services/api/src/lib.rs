pub mod adapters;
pub mod analysis;
pub mod config;
pub mod error;
pub mod web;
