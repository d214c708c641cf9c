//! Command-line client for a cloudaudit server: sequential category
//! batches with status polling, job status lookups and report downloads.

#![allow(missing_docs)]

pub mod cli;
pub mod commands;
pub mod output;
