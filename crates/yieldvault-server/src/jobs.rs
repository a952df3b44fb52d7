//! Background jobs started with the server.

pub mod maturity;

pub use maturity::{MaturityScheduler, SweepReport};
