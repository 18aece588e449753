//! Write the default configuration file.

use reelsmith_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, force: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    if path.exists() && !force {
        println!("Config already exists at {} (use --force to overwrite)", path.display());
        return Ok(());
    }

    let written = AppConfig {
        outputs_dir: config.outputs_dir.clone(),
        ..AppConfig::default()
    }
    .save()?;

    let defaults = &config.compose;
    println!("Wrote config to {}", written.display());
    println!("  Outputs: {}", config.outputs_dir.display());
    println!(
        "  Canvas: {}x{} @ {}fps",
        defaults.width, defaults.height, defaults.fps
    );
    println!();
    println!("Expected layout:");
    println!("  {}/", config.outputs_dir.display());
    println!("  ├── plan.json");
    println!("  ├── images/          (clip<N>.png)");
    println!("  ├── video_provider/  (clip<N>.mp4)");
    println!("  ├── audio/           (clip<N>.mp3|wav|opus|ulaw|alaw)");
    println!("  └── video/           (rendered output)");

    Ok(())
}
