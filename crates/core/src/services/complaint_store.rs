//! Storage seam for complaint records.

use std::sync::Arc;

use async_trait::async_trait;
use fixmycity_common::{AppError, AppResult, IdGenerator};
use fixmycity_db::{
    entities::complaint::{self, ComplaintStatus},
    repositories::{ComplaintRepository, NewComplaint},
};
use tokio::sync::RwLock;

/// Document store holding complaints.
///
/// Implementations assign the identifier and creation timestamp, start every
/// complaint at [`ComplaintStatus::Pending`], and list newest first.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Persist a new complaint.
    async fn create(&self, input: NewComplaint) -> AppResult<complaint::Model>;

    /// All complaints, newest first.
    async fn list(&self) -> AppResult<Vec<complaint::Model>>;

    /// One complaint by ID.
    async fn get(&self, id: &str) -> AppResult<complaint::Model>;

    /// Overwrite the status field only.
    async fn update_status(&self, id: &str, status: ComplaintStatus) -> AppResult<()>;
}

/// Shared handle to a complaint store.
pub type ComplaintStoreService = Arc<dyn ComplaintStore>;

#[async_trait]
impl ComplaintStore for ComplaintRepository {
    async fn create(&self, input: NewComplaint) -> AppResult<complaint::Model> {
        Self::create(self, input).await
    }

    async fn list(&self) -> AppResult<Vec<complaint::Model>> {
        Self::list(self).await
    }

    async fn get(&self, id: &str) -> AppResult<complaint::Model> {
        self.get_by_id(id).await
    }

    async fn update_status(&self, id: &str, status: ComplaintStatus) -> AppResult<()> {
        Self::update_status(self, id, status).await
    }
}

/// In-process complaint store.
///
/// Backs tests and `memory://` development runs. Contents are lost on exit.
#[derive(Clone, Default)]
pub struct MemoryComplaintStore {
    rows: Arc<RwLock<Vec<complaint::Model>>>,
    id_gen: IdGenerator,
}

impl MemoryComplaintStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored complaints.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether the store holds no complaints.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ComplaintStore for MemoryComplaintStore {
    async fn create(&self, input: NewComplaint) -> AppResult<complaint::Model> {
        let model = complaint::Model {
            id: self.id_gen.generate(),
            title: input.title,
            description: input.description,
            photo_url: input.photo_url,
            audio_url: input.audio_url,
            location: input.location,
            latitude: input.latitude,
            longitude: input.longitude,
            status: ComplaintStatus::Pending,
            created_at: chrono::Utc::now().into(),
        };

        self.rows.write().await.push(model.clone());
        Ok(model)
    }

    async fn list(&self) -> AppResult<Vec<complaint::Model>> {
        let mut rows = self.rows.read().await.clone();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn get(&self, id: &str) -> AppResult<complaint::Model> {
        self.rows
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Complaint: {id}")))
    }

    async fn update_status(&self, id: &str, status: ComplaintStatus) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Complaint: {id}")))?;
        row.status = status;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(title: &str) -> NewComplaint {
        NewComplaint {
            title: title.to_string(),
            description: "Pole 12 near market".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_memory_create_assigns_distinct_ids() {
        let store = MemoryComplaintStore::new();

        let first = store.create(input("first")).await.unwrap();
        let second = store.create(input("second")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, ComplaintStatus::Pending);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_memory_list_newest_first() {
        let store = MemoryComplaintStore::new();
        let t1 = store.create(input("t1")).await.unwrap();
        let t2 = store.create(input("t2")).await.unwrap();
        let t3 = store.create(input("t3")).await.unwrap();

        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, [t3.id, t2.id, t1.id]);
    }

    #[tokio::test]
    async fn test_memory_update_status_missing() {
        let store = MemoryComplaintStore::new();
        store.create(input("only")).await.unwrap();

        let result = store.update_status("missing", ComplaintStatus::Completed).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let rows = store.list().await.unwrap();
        assert_eq!(rows[0].status, ComplaintStatus::Pending);
    }

    #[tokio::test]
    async fn test_memory_update_status_visible_to_list() {
        let store = MemoryComplaintStore::new();
        let created = store.create(input("only")).await.unwrap();

        store
            .update_status(&created.id, ComplaintStatus::WorkGoingOn)
            .await
            .unwrap();

        let rows = store.list().await.unwrap();
        assert_eq!(rows[0].status, ComplaintStatus::WorkGoingOn);
    }
}
