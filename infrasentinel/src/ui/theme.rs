//! Shared UI theme constants.

use ratatui::style::Color;

// Scrollbar colors
pub const SB_ARROW: Color = Color::Rgb(170, 170, 180);
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

// Chart series
pub const CPU_COLOR: Color = Color::Rgb(59, 130, 246);
pub const MEM_COLOR: Color = Color::Rgb(6, 182, 212);
pub const DISK_COLOR: Color = Color::Rgb(245, 158, 11);

pub const OK_COLOR: Color = Color::Rgb(46, 204, 113);
pub const WARN_COLOR: Color = Color::Rgb(245, 158, 11);
pub const DANGER_COLOR: Color = Color::Rgb(239, 68, 68);
pub const MUTED: Color = Color::Rgb(100, 116, 139);
