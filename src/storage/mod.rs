mod app_info;
mod mutation_log;
mod replication_app;

pub use app_info::*;
pub use mutation_log::*;
pub use replication_app::*;
