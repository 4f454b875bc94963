//! UI module root: exposes drawing functions for individual panels.

pub mod alerts;
pub mod chart;
pub mod docker;
pub mod gauges;
pub mod header;
pub mod modal;
pub mod processes;
pub mod theme;
pub mod util;
