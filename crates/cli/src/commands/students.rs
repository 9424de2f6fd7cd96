//! `oxtutor students` — List students known to the store.

use oxtutor_config::AppConfig;
use oxtutor_core::StudentRepository;
use oxtutor_store::SqliteStudentStore;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let store = SqliteStudentStore::new(&config.store.db_path).await?;

    let ids = store.list_ids().await?;
    if ids.is_empty() {
        println!("No students yet — one is created on first session start.");
        return Ok(());
    }

    println!("{} student(s):", ids.len());
    for id in ids {
        match store.load(&id).await? {
            Some(model) => {
                println!(
                    "  {id}  sessions: {}  concepts tracked: {}  last updated: {}",
                    model.session_history.len(),
                    model.competencies.len(),
                    model.updated_at.format("%Y-%m-%d %H:%M"),
                );
            }
            None => println!("  {id}"),
        }
    }

    Ok(())
}
