//! Provider Wire Formatters
//!
//! Transform domain instructions into provider-specific formats.

mod ncco;

pub use ncco::to_ncco;
