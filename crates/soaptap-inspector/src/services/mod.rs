//! Services bundled with the demo host.

pub mod calculator;

pub use calculator::CalculatorService;
