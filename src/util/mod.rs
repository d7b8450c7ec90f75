//! Utility modules

pub mod paths;
pub mod text;

pub use paths::{config_path, data_dir, init_data_dir, log_file_path, logs_dir};
pub use text::{auto_title, truncate_display};
