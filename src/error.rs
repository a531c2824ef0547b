//! The typed error kinds raised by the interpreter. Everything else
//! (allocation limits, missing lookups) stays untyped `anyhow` errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlchemistError {
    /// A value that fits no expression variant was found in a render
    /// position, e.g. a bare attributes map. Carries the offending
    /// value's representation.
    #[error("unrecognized expression: {0}")]
    UnrecognizedExpression(String),

    /// A selector with an empty tag name in one of its segments.
    #[error("malformed selector {0:?}: empty tag name")]
    MalformedSelector(String),
}
