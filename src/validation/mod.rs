//! Event validation
//!
//! Every event is validated exactly once, when it is constructed or
//! deserialized. Checks run in a fixed order and the first failure wins.

mod rules;

pub use rules::{validate_fields, zero_time, ValidationError, MIN_FIELD_LEN};
