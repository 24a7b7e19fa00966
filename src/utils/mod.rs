//! Utility functions for file input and output and for logging

pub mod io;
pub mod logging;
