//! In-memory student-model store.
//!
//! No persistence across restarts. Used in tests and anywhere no
//! student history should be kept.

use async_trait::async_trait;
use oxtutor_core::error::StoreError;
use oxtutor_core::{StudentModel, StudentRepository};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryStudentStore {
    models: Mutex<HashMap<String, StudentModel>>,
}

impl InMemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentStore {
    async fn load(
        &self,
        student_id: &str,
    ) -> std::result::Result<Option<StudentModel>, StoreError> {
        let models = self
            .models
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        Ok(models.get(student_id).cloned())
    }

    async fn save(&self, model: &StudentModel) -> std::result::Result<(), StoreError> {
        let mut models = self
            .models
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        models.insert(model.student_id.clone(), model.clone());
        Ok(())
    }

    async fn create_default(
        &self,
        student_id: &str,
    ) -> std::result::Result<StudentModel, StoreError> {
        let model = StudentModel::new(student_id);
        self.save(&model).await?;
        Ok(model)
    }

    async fn delete(&self, student_id: &str) -> std::result::Result<bool, StoreError> {
        let mut models = self
            .models
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        Ok(models.remove(student_id).is_some())
    }

    async fn list_ids(&self) -> std::result::Result<Vec<String>, StoreError> {
        let models = self
            .models
            .lock()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))?;
        let mut ids: Vec<String> = models.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
