//! The `utils` module provides shared definitions used across `notifysub`:
//! error types and logging setup.

pub mod error;
pub mod logging;

#[cfg(test)]
mod tests;
