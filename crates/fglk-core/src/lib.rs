#![forbid(unsafe_code)]

//! Core: shared types for the fglk Glk compatibility engine.
//!
//! # Role in fglk
//! `fglk-core` is the leaf crate every other crate builds on. It owns the
//! pieces with no engine state of their own: the layout box, the renderer
//! supplied content metrics, the numeric Glk codes exchanged with the
//! virtual machine, Unicode case folding, and the fatal error type.
//!
//! # How it fits in the system
//! `fglk-layout` lays windows out in [`geometry::WindowBox`] units using
//! [`metrics::ContentMetrics`]. `fglk-runtime` decodes VM arguments through
//! [`codes`] and reports contract violations as [`error::GlkError`].

pub mod casemap;
pub mod codes;
pub mod error;
pub mod geometry;
pub mod metrics;
pub mod style;

pub use error::GlkError;
