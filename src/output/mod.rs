//! Output module for console output and progress.
//!
//! Provides:
//! - Colored console output
//! - Progress bars
//! - Run reports

pub mod console;
pub mod progress;
pub mod stats;

pub use console::{
    print_banner, print_error, print_info, print_manifest_summary, print_success, print_warning,
};
pub use progress::create_item_bar;
pub use stats::{print_run_report, print_summary};
