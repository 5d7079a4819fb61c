//! Protocol modules shared with the evaluation engines.
//!
//! Engines speak plain text. The only structured signal read back from their
//! output is the action marker handled in [`trace`].

pub mod trace;
