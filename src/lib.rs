//! Parsons problem backend: validation and adaptive difficulty engine plus a
//! small axum service around it.
//!
//! Engine (pure, synchronous):
//!   - `problem`, `parse`: problem model and the marker text encoding
//!   - `arrangement`: learner solution/scrap areas and group exclusivity
//!   - `indent`: indentation levels and relative-indentation hints
//!   - `validation`: rule set and verdict aggregation
//!   - `adaptive`: simplifying transforms and the adaptive policy
//!   - `generator`: problems (and distractors) from plain source code
//!
//! Service: `config`, `telemetry`, `seeds`, `state`, `protocol`, `logic`, `routes`.

pub mod adaptive;
pub mod arrangement;
pub mod config;
pub mod error;
pub mod generator;
pub mod indent;
pub mod logic;
pub mod parse;
pub mod problem;
pub mod protocol;
pub mod routes;
pub mod seeds;
pub mod state;
pub mod telemetry;
pub mod util;
pub mod validation;
