//! Glyphs used in messages and the summary.

pub const ARROW_SYMBOL: &str = "› ";
pub const BULLET_SYMBOL: &str = "• ";
pub const ERROR_SYMBOL: &str = "✕ ";
pub const SUCCESS_SYMBOL: &str = "✓ ";
pub const UPDATE_SYMBOL: &str = "✎ ";
pub const ENTER_SYMBOL: &str = "↳ ";
pub const SKIP_SYMBOL: &str = "⟳ ";
