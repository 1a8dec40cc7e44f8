pub mod api;
pub mod config;
pub mod humanize;
pub mod jobs;
pub mod observability;
pub mod provider;
