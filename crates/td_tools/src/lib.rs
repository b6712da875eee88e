//! # TD Development Tools
//!
//! Command-line tools for development:
//! - Map catalog validation

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod validate;
