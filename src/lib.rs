//! Cross-filtering engine for linked patient and event tables.
//!
//! Tables come in through [`data::loader`], filters and cross-filtering live
//! in [`data`], chart-ready projections in [`views`], and [`state`] ties them
//! together behind named transitions.

pub mod alert;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod state;
pub mod tools;
pub mod views;
