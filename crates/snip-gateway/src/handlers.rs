mod health;
mod url;

pub use health::{health_handler, root_handler};
pub use url::{redirect_handler, search_handler, shorten_handler, stats_handler, top_handler};
