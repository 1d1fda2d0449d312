//! Landmark domain model.
//!
//! # Responsibility
//! - Define the hierarchical location record used for structured addresses.
//! - Provide lifecycle helpers for retire/unretire semantics.
//!
//! # Invariants
//! - `uuid` is assigned at construction and never reused for another landmark.
//! - `id` is assigned by storage on first save and never changes afterwards.
//! - `name` must be non-blank before the landmark can be persisted.
//! - A landmark is never its own parent.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Storage-assigned integer identity.
pub type LandmarkId = i64;

/// Hierarchical location record.
///
/// Landmarks form a forest through `parent_id`; a landmark without a parent
/// is a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    /// `None` until the first save.
    pub id: Option<LandmarkId>,
    /// Stable global ID used for external references.
    pub uuid: Uuid,
    pub name: String,
    /// Free-form coordinate text, not validated.
    pub latitude: Option<String>,
    /// Free-form coordinate text, not validated.
    pub longitude: Option<String>,
    pub parent_id: Option<LandmarkId>,
    /// Soft-delete flag. Retired rows stay queryable.
    pub retired: bool,
    /// Kept across unretire.
    pub retire_reason: Option<String>,
    /// Epoch ms, maintained by storage.
    pub created_at: Option<i64>,
    /// Epoch ms, maintained by storage.
    pub updated_at: Option<i64>,
}

/// Validation failures for landmark write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LandmarkValidationError {
    /// Name is empty or whitespace only.
    EmptyName,
    /// `parent_id` points at the landmark itself.
    SelfParent(LandmarkId),
}

impl Display for LandmarkValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "landmark name is required"),
            Self::SelfParent(id) => write!(f, "landmark {id} cannot be its own parent"),
        }
    }
}

impl Error for LandmarkValidationError {}

impl Landmark {
    /// Creates an unsaved landmark with a generated uuid.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_uuid(Uuid::new_v4(), name)
    }

    /// Creates an unsaved landmark with a caller-provided uuid.
    pub fn with_uuid(uuid: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: None,
            uuid,
            name: name.into(),
            latitude: None,
            longitude: None,
            parent_id: None,
            retired: false,
            retire_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Sets the parent link, builder style.
    pub fn child_of(mut self, parent_id: LandmarkId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets both coordinates, builder style.
    pub fn at(mut self, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        self.latitude = Some(latitude.into());
        self.longitude = Some(longitude.into());
        self
    }

    /// Marks this landmark retired with the given reason.
    pub fn retire(&mut self, reason: impl Into<String>) {
        self.retired = true;
        self.retire_reason = Some(reason.into());
    }

    /// Clears the retired flag. The previous reason is left in place.
    pub fn unretire(&mut self) {
        self.retired = false;
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_active(&self) -> bool {
        !self.retired
    }

    /// Label shown in pickers and address widgets.
    pub fn display_string(&self) -> &str {
        &self.name
    }

    /// Identity as text for attribute storage; empty when unsaved.
    pub fn serialize_id(&self) -> String {
        self.id.map(|id| id.to_string()).unwrap_or_default()
    }

    /// Checks the invariants every persisted landmark must satisfy.
    pub fn validate(&self) -> Result<(), LandmarkValidationError> {
        if self.name.trim().is_empty() {
            return Err(LandmarkValidationError::EmptyName);
        }
        if let (Some(id), Some(parent_id)) = (self.id, self.parent_id) {
            if id == parent_id {
                return Err(LandmarkValidationError::SelfParent(id));
            }
        }
        Ok(())
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl Display for Landmark {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if !self.name.is_empty() {
            return write!(f, "{}", self.name);
        }
        match self.id {
            Some(id) => write!(f, "{id}"),
            None => Ok(()),
        }
    }
}
