//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskflow_core` linkage.
//! - Optionally bootstrap file logging: `taskflow_cli [ABSOLUTE_LOG_DIR]`.

use std::process::ExitCode;
use taskflow_core::db::migrations::latest_version;
use taskflow_core::{core_version, default_log_level, init_logging, ping};

fn main() -> ExitCode {
    if let Some(log_dir) = std::env::args().nth(1) {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("taskflow_core logging error={err}");
            return ExitCode::FAILURE;
        }
        println!("taskflow_core log_dir={log_dir}");
    }

    println!("taskflow_core ping={}", ping());
    println!("taskflow_core version={}", core_version());
    println!("taskflow_core schema_version={}", latest_version());
    ExitCode::SUCCESS
}
