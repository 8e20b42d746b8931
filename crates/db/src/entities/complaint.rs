//! Complaint entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a complaint.
///
/// Stored and serialized as the display string shown to citizens and admins.
/// Any status may be set from any other.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[derive(Default)]
pub enum ComplaintStatus {
    #[sea_orm(string_value = "Pending")]
    #[serde(rename = "Pending")]
    #[default]
    Pending,
    #[sea_orm(string_value = "Approved")]
    #[serde(rename = "Approved")]
    Approved,
    #[sea_orm(string_value = "Under Processing")]
    #[serde(rename = "Under Processing")]
    UnderProcessing,
    #[sea_orm(string_value = "Work Going On")]
    #[serde(rename = "Work Going On")]
    WorkGoingOn,
    #[sea_orm(string_value = "Completed")]
    #[serde(rename = "Completed")]
    Completed,
}

impl ComplaintStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Approved,
        Self::UnderProcessing,
        Self::WorkGoingOn,
        Self::Completed,
    ];

    /// Display string, identical to the stored value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::UnderProcessing => "Under Processing",
            Self::WorkGoingOn => "Work Going On",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown complaint status: {s}"))
    }
}

/// Complaint model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "complaint")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Public URL of the attached photo, empty when none.
    #[sea_orm(column_type = "Text")]
    pub photo_url: String,
    /// Public URL of the attached voice note, empty when none.
    #[sea_orm(column_type = "Text")]
    pub audio_url: String,
    /// Manual location text or a reverse-geocoded address.
    #[sea_orm(column_type = "Text")]
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: ComplaintStatus,
    /// Assigned by the database on insert.
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// The captured coordinate pair, if both halves are present.
    #[must_use]
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
