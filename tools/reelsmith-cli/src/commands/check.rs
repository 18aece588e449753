//! Check system capabilities.

use std::path::Path;

use reelsmith_common::config::{config_file_path, AppConfig};
use reelsmith_render_engine::ffmpeg::command_exists;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Reelsmith System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for binary in ["ffmpeg", "ffprobe"] {
        if command_exists(binary) {
            println!("[OK] {binary} found in PATH");
        } else {
            println!("[MISSING] {binary} not found in PATH");
            all_ok = false;
        }
    }

    let (config_ok, line) = config_status(&config_file_path());
    println!("{line}");
    all_ok &= config_ok;

    if config.outputs_dir.is_dir() {
        println!("[OK] Outputs: {}", config.outputs_dir.display());
    } else {
        println!("[WARN] Outputs directory does not exist: {}", config.outputs_dir.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available. Reelsmith is ready.");
        Ok(())
    } else {
        anyhow::bail!("system check failed")
    }
}

/// Report line for the config file, and whether it is usable.
fn config_status(path: &Path) -> (bool, String) {
    if !path.exists() {
        return (
            true,
            format!("[INFO] Config: defaults (run `reelsmith init` to write {})", path.display()),
        );
    }
    match AppConfig::load_from(path) {
        Ok(_) => (true, format!("[OK] Config: {}", path.display())),
        Err(err) => (false, format!("[ERROR] Config: {err}")),
    }
}
