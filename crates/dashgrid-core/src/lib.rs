#![forbid(unsafe_code)]

//! Core: geometry shared by every dashgrid crate.
//!
//! # Role in dashgrid
//! `dashgrid-core` owns the coordinate math: grid boxes in cells, pixel
//! rectangles, column width derived from a measured container. It has no
//! interaction state, so both the layout algorithms (`dashgrid-layout`) and
//! the interactive engine (`dashgrid-runtime`) build on it.

pub mod geometry;

pub use geometry::{GridMetrics, GridPoint, GridRect, GridSpan, MeasuredGrid, PixelRect};
