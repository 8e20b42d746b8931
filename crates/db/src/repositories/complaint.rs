//! Complaint repository.

use std::sync::Arc;

use crate::entities::{
    Complaint,
    complaint::{self, ComplaintStatus},
};
use fixmycity_common::{AppError, AppResult, IdGenerator};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

/// Fields supplied by the caller when a complaint is created.
///
/// The identifier, status and creation timestamp are never part of the
/// input: the store assigns them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewComplaint {
    pub title: String,
    pub description: String,
    pub photo_url: String,
    pub audio_url: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Complaint repository for database operations.
#[derive(Clone)]
pub struct ComplaintRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl ComplaintRepository {
    /// Create a new complaint repository.
    #[must_use]
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Insert a complaint and return the stored row.
    ///
    /// `created_at` is left to the column default so the database clock is
    /// authoritative.
    pub async fn create(&self, input: NewComplaint) -> AppResult<complaint::Model> {
        let model = complaint::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(input.title),
            description: Set(input.description),
            photo_url: Set(input.photo_url),
            audio_url: Set(input.audio_url),
            location: Set(input.location),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            status: Set(ComplaintStatus::Pending),
            created_at: NotSet,
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Find a complaint by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<complaint::Model>> {
        Complaint::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Get a complaint by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<complaint::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Complaint: {id}")))
    }

    /// All complaints, newest first.
    pub async fn list(&self) -> AppResult<Vec<complaint::Model>> {
        Complaint::find()
            .order_by_desc(complaint::Column::CreatedAt)
            .order_by_desc(complaint::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Overwrite the status column of one complaint.
    pub async fn update_status(&self, id: &str, status: ComplaintStatus) -> AppResult<()> {
        let result = Complaint::update_many()
            .set(complaint::ActiveModel {
                status: Set(status),
                ..Default::default()
            })
            .filter(complaint::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Complaint: {id}")));
        }

        Ok(())
    }
}
