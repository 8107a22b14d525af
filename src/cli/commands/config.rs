//! Config command handlers

use crate::config::Config;

pub fn cmd_init_config() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings.");
        println!("Change club.member_passcode and club.admin_passcode before going live.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}

pub fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    config.validate()?;

    println!("Configuration OK");
    println!("{:-<50}", "");
    println!("  Environment:    {:?}", config.general.environment);
    println!("  Database:       {}", config.general.database_path);
    println!(
        "  Listen:         {}:{}",
        config.server.bind_address, config.server.port
    );
    println!("  Session store:  {:?}", config.server.session_store);
    println!("  Secure cookies: {}", config.server.secure_cookies);
    println!(
        "  Metrics:        {}",
        if config.observability.metrics_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}
