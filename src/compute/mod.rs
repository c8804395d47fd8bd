//! Compute layer for input validation.
//!
//! Every boundary that accepts a coordinate, a path, a radius or a
//! precision level runs it through [`validation`] before touching the cell
//! hierarchy.

pub mod validation;
