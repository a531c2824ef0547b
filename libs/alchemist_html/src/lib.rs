//! Static metadata about HTML elements: the known tag names and which of
//! them are void (no closing tag, no content).

pub mod meta;
