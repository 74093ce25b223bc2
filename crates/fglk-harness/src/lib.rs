#![forbid(unsafe_code)]

//! Host side of the `fglk-harness` binary: argument parsing, the
//! stdin/stdout loop and the built-in demo story.

pub mod cli;
pub mod demo;
pub mod host;

pub use demo::DemoVm;
pub use host::Host;
