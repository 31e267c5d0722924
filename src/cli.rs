//! CLI domain: parse, route, output, and presentation only.
//! The route table dispatches to library operations; nothing is generated here.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use route::RunContext;
