//! `rustedtutor onboard`: write a default config file.

use rustedtutor_config::{AppConfig, CONFIG_FILE};

pub fn run() -> super::CmdResult {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join(CONFIG_FILE);

    println!("RustedTutor — First-Time Setup");
    println!("==============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("  Created config.toml at: {}", config_path.display());
    println!("\n  Next steps:");
    println!("   1. Try it offline: rustedtutor ask \"Solve 2*x + 5 = 11\"");
    println!("   2. For model-written answers, set OPENROUTER_API_KEY and");
    println!("      tutor.classifier / tutor.handler = \"llm\" in {}", config_path.display());
    println!();

    Ok(())
}
