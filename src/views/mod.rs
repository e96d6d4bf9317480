//! Derived views over the filtered tables: histograms, scatter plot,
//! timeline lanes, and the background worker that computes histograms.

pub mod bins;
pub mod scatter;
pub mod timeline;
pub mod worker;
