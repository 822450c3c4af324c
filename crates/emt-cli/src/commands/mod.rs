//! CLI subcommand implementations.

pub mod current;
pub mod estimate;
pub mod history;
pub mod util;
