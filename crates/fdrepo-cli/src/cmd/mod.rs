//! One module per subcommand

pub mod add;
pub mod check;
pub mod completions;
pub mod status;
pub mod update;
