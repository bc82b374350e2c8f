use colored::Color;

pub const PRIMARY: Color = Color::BrightCyan;
pub const SECONDARY: Color = Color::Cyan;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const REACHABLE: Color = Color::BrightGreen;
pub const UNREACHABLE: Color = Color::BrightRed;
pub const ERRORED: Color = Color::Magenta;
pub const LATENCY: Color = Color::Yellow;
