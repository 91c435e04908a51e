//! Configuration file commands

use anyhow::{Context, Result};
use fsaudit_core::config::example_config;
use fsaudit_core::MonitorConfig;
use owo_colors::OwoColorize;
use std::path::Path;

/// Print a commented example configuration
pub fn run_example() -> Result<()> {
    print!("{}", example_config());
    Ok(())
}

/// Load and validate a configuration file, then show the effective values
pub fn run_check(path: &Path) -> Result<()> {
    let config = MonitorConfig::load(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    println!("{} {}", "✓".green(), format!("{} is valid", path.display()).bold());
    print_config(&config);
    Ok(())
}

fn print_config(config: &MonitorConfig) {
    println!("  {} = {}", "root".cyan(), config.root.display());
    println!("  {} = {}", "log_file".cyan(), config.log_path().display());
    match config.json_log_path() {
        Some(export) => println!("  {} = {}", "json_log".cyan(), export.display()),
        None => println!("  {} = {}", "json_log".cyan(), "(disabled)".dimmed()),
    }
    println!(
        "  {} = {} {}",
        "window_ms".cyan(),
        config.window_ms,
        format!("({:.1}s)", config.window_ms as f64 / 1000.0).dimmed()
    );
    println!("  {} = {}", "tick_ms".cyan(), config.tick_ms);
    println!("  {} = {}", "noise_names".cyan(), config.noise_names.join(", "));
    println!("  {} = {}", "drain_on_shutdown".cyan(), config.drain_on_shutdown);
    println!("  {} = {}", "color".cyan(), config.color);
    println!("\n{}", "[sources]".yellow());
    println!("  {} = {}", "notify".cyan(), config.sources.notify);
    println!(
        "  {} = {} {}",
        "fanotify".cyan(),
        config.sources.fanotify,
        if cfg!(target_os = "linux") {
            "".to_string()
        } else {
            "(unavailable on this platform)".dimmed().to_string()
        }
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  window_ms: 1-3,600,000");
    println!("  tick_ms: 1-60,000");
}
