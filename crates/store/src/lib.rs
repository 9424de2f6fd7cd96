//! SQLite persistence for oxtutor.
//!
//! One backend: [`SqliteStudentStore`], which keeps long-lived student
//! models in a single `student_models` table. Each model is stored as a
//! JSON document, keyed by student id, upserted on every save.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStudentStore;
pub use sqlite::SqliteStudentStore;
