pub mod circuit_breaker;
pub mod controller;

pub use circuit_breaker::*;
pub use controller::*;

#[cfg(test)]
mod tests;
