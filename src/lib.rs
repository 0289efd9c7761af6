//! Weekly activity digest for one Bitrix24 user.
//!
//! Tasks, meetings, logged time and local git commits are collected for a
//! date window and rendered as Markdown or JSON. Chat summaries are optional.

pub mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test_helpers;
