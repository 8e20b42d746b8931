//! Business logic services.

#![allow(missing_docs)]

pub mod complaint;
pub mod complaint_store;
pub mod geocoding;
pub mod media;

pub use complaint::{
    ComplaintDraft, ComplaintService, DEFAULT_MAP_CENTER, DEFAULT_MAP_ZOOM, MapMarker, MapView,
    Submission, SubmissionStage,
};
pub use complaint_store::{ComplaintStore, ComplaintStoreService, MemoryComplaintStore};
pub use geocoding::{Coordinates, Geocoder, GeocoderService, GeocodingClient, NoOpGeocoder};
pub use media::{
    DEFAULT_MAX_UPLOAD_SIZE, MediaKind, MediaPayload, MediaUploader, content_type_for_key,
};
