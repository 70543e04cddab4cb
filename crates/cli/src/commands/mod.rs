//! Command implementations.

mod catalog;
mod interactive;
mod list_blueprints;
mod load_xodr;

pub use catalog::run_catalog;
pub use interactive::{run_interactive, surface_launcher};
pub use list_blueprints::run_list_blueprints;
pub use load_xodr::{run_load_xodr, XodrReport};
