//! `rustedtutor status`: show the effective configuration.

use rustedtutor_config::{AppConfig, CONFIG_FILE};

use super::{CmdResult, constant_table, load_config, provider_ready};

pub fn run(offline: bool) -> CmdResult {
    let config = load_config()?;
    let table = constant_table(&config)?;

    let mode = if offline || !config.wants_llm() {
        "offline (keyword classifier, reference handler)"
    } else if provider_ready(&config) {
        "language model"
    } else {
        "offline (no API key for the configured provider)"
    };

    println!("RustedTutor Status");
    println!("==================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Mode:         {mode}");
    println!("  Provider:     {}", config.default_provider);
    println!("  Model:        {}", config.model());
    println!("  Temperature:  {}", config.default_temperature);
    let key_state = if config.api_key_for(&config.default_provider).is_some() {
        "set"
    } else {
        "not set"
    };
    println!("  API key:      {key_state}");
    println!("  Classifier:   {:?}", config.tutor.classifier);
    println!("  Handler:      {:?}", config.tutor.handler);
    println!("  Tie-break:    {:?}", config.tutor.tie_break);
    println!("  Tool rounds:  {}", config.tutor.max_tool_iterations);
    println!(
        "  Keywords:     +{} physics, +{} math, +{} cs",
        config.keywords.physics.len(),
        config.keywords.math.len(),
        config.keywords.cs.len()
    );
    println!("  Constants:    {}", table.len());

    let config_path = AppConfig::config_dir().join(CONFIG_FILE);
    if config_path.exists() {
        println!("\n  Config file found");
    } else {
        println!("\n  No config file, using defaults (run `rustedtutor onboard` to create one)");
    }

    Ok(())
}
