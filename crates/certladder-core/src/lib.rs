//! certladder-core: adaptive assessment engine.
//!
//! This crate holds the threshold table, scorer, level resolver, progression
//! gate, countdown controller and attempt coordinator that drive a learner
//! through the A1→C2 certification ladder.

pub mod attempt;
pub mod certificate;
pub mod driver;
pub mod error;
pub mod level;
pub mod model;
pub mod parser;
pub mod progression;
pub mod report;
pub mod resolver;
pub mod scoring;
pub mod thresholds;
pub mod timer;
pub mod traits;
