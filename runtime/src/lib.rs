//! Container runtime implementations for containerburn
//!
//! This crate provides implementations of the `ContainerRuntime` trait for:
//!
//! - Docker Engine (via `bollard`), connected from the process environment

#![warn(missing_docs)]
#![warn(clippy::all)]

mod convert;
mod docker;

pub use docker::DockerRuntime;
