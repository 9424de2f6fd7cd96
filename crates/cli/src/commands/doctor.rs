//! `oxtutor doctor` — Diagnose setup problems.

use oxtutor_config::AppConfig;
use oxtutor_store::SqliteStudentStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("oxtutor doctor — setup diagnostics");
    println!("==================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  [fail] No config file — run `oxtutor onboard`");
        issues += 1;
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  [ ok ] Config loads");

            match config.validate() {
                Ok(()) => println!("  [ ok ] Config values valid"),
                Err(e) => {
                    println!("  [fail] Config invalid: {e}");
                    issues += 1;
                }
            }

            if config.api_key.as_deref().unwrap_or("").is_empty() {
                println!("  [warn] No API key — set api_key or OXTUTOR_API_KEY");
                issues += 1;
            } else {
                println!("  [ ok ] API key configured");
            }

            if config.transcription.endpoint.is_empty() {
                println!("  [warn] No transcription endpoint — audio tools will degrade");
            } else {
                println!("  [ ok ] Transcription endpoint set");
            }

            match SqliteStudentStore::new(&config.store.db_path).await {
                Ok(_) => println!("  [ ok ] Student database opens at {}", config.store.db_path),
                Err(e) => {
                    println!("  [fail] Student database: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  [fail] Config unreadable: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        println!("  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
