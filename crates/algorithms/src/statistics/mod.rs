//! Region-wide statistics
//!
//! - **zonal**: mean and standard deviation over a study region under a
//!   pixel budget

pub mod zonal;

pub use zonal::{scale_factor, zonal_summary, Reducer, ZonalParams, ZonalStatistic, ZonalSummary};
