//! `voxloop config`: show the effective configuration.

use voxloop_config::AppConfig;

pub fn run(config: &AppConfig) {
    println!("# Effective configuration (file + environment, secrets redacted)");
    println!("{}", config.redacted_toml());
    println!("# History path: {}", config.history.resolved_path().display());
}
