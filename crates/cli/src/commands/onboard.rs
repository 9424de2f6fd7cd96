//! `oxtutor onboard` — First-time setup.

use oxtutor_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("oxtutor — First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("  Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n  Config already exists at: {}", config_path.display());
        println!("  Edit it manually or delete and re-run onboard.");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  Created config.toml at: {}", config_path.display());
    }

    // Make sure the student database has somewhere to live.
    let config = AppConfig::load()?;
    if let Some(parent) = std::path::Path::new(&config.store.db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            println!("  Created database directory: {}", parent.display());
        }
    }

    println!("\nNext steps:");
    println!("  1. Add your OpenRouter API key to config.toml (or set OXTUTOR_API_KEY)");
    println!("  2. Optionally point transcription.endpoint at a local whisper server");
    println!("  3. Run `oxtutor serve` and connect a client to /ws");

    Ok(())
}
