//! Digest persistence
//!
//! Renders the collected data to Markdown and writes it under the output
//! directory.

pub mod markdown;

pub use markdown::{digest_filename, Digest, DigestWriter};
