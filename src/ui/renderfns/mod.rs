mod header;
mod utils;

pub use header::draw_header;
pub use utils::{metric, schedule_color, severity_color, status_color, truncate};
