//! Landmark use-case service.
//!
//! # Responsibility
//! - Validate landmark writes above the store (name, uniqueness, parent links).
//! - Apply retire/unretire/purge rules and default-parameter resolution.
//! - Read and write the address template global setting.
//!
//! # Invariants
//! - Names are trimmed and unique across all landmarks, retired included.
//! - Parent links never form a cycle.
//! - Retiring requires a non-blank reason; unretiring keeps the old reason.
//! - Lookups that find nothing return `Ok(None)`, never an error.

use crate::model::landmark::{Landmark, LandmarkId, LandmarkValidationError};
use crate::repo::landmark_repo::{LandmarkRepository, LandmarkSearch};
use crate::repo::setting_repo::SettingRepository;
use crate::repo::RepoError;
use log::{debug, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Setting key under which the address template XML is stored.
pub const ADDRESS_TEMPLATE_SETTING_KEY: &str = "layout.address.format";

/// Template returned when no address template has been saved.
pub const DEFAULT_ADDRESS_TEMPLATE: &str = r#"<addressTemplate>
    <nameMappings>
        <property name="address1" value="Address"/>
        <property name="address2" value="Address 2"/>
        <property name="cityVillage" value="City/Village"/>
        <property name="stateProvince" value="State/Province"/>
        <property name="country" value="Country"/>
        <property name="postalCode" value="Postal Code"/>
        <property name="latitude" value="Latitude"/>
        <property name="longitude" value="Longitude"/>
    </nameMappings>
    <sizeMappings>
        <property name="address1" value="40"/>
        <property name="address2" value="40"/>
        <property name="cityVillage" value="10"/>
        <property name="stateProvince" value="10"/>
        <property name="country" value="10"/>
        <property name="postalCode" value="5"/>
        <property name="latitude" value="10"/>
        <property name="longitude" value="10"/>
    </sizeMappings>
    <lineByLineFormat>
        <string>address1</string>
        <string>address2</string>
        <string>cityVillage stateProvince country postalCode</string>
        <string>latitude longitude</string>
    </lineByLineFormat>
</addressTemplate>"#;

pub type ServiceResult<T> = Result<T, LandmarkServiceError>;

/// Errors from landmark service operations.
#[derive(Debug)]
pub enum LandmarkServiceError {
    /// Landmark failed entity validation (blank name, self parent).
    Invalid(LandmarkValidationError),
    /// Retire was called with a blank reason.
    MissingRetireReason,
    /// Address template save was called with blank XML.
    EmptyAddressTemplate,
    /// Another landmark already uses this exact name.
    DuplicateName(String),
    /// `parent_id` points at a landmark that does not exist.
    ParentNotFound(LandmarkId),
    /// Saving would make the landmark its own ancestor.
    CycleDetected {
        landmark_id: LandmarkId,
        parent_id: LandmarkId,
    },
    /// Purge was called on a landmark that was never saved.
    Unsaved,
    /// Update or purge targeted an id with no row.
    NotFound(LandmarkId),
    /// Persistence-layer failure, propagated unchanged.
    Storage(RepoError),
}

impl LandmarkServiceError {
    /// Returns whether the caller sent an invalid request, as opposed to a
    /// storage failure. Invalid requests must not be retried.
    pub fn is_invalid_request(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::NotFound(_))
    }
}

impl Display for LandmarkServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::MissingRetireReason => write!(f, "a reason is required when retiring a landmark"),
            Self::EmptyAddressTemplate => write!(f, "address template must not be blank"),
            Self::DuplicateName(name) => write!(f, "landmark name already in use: `{name}`"),
            Self::ParentNotFound(id) => write!(f, "parent landmark not found: {id}"),
            Self::CycleDetected {
                landmark_id,
                parent_id,
            } => write!(
                f,
                "parent {parent_id} would make landmark {landmark_id} its own ancestor"
            ),
            Self::Unsaved => write!(f, "landmark has not been saved"),
            Self::NotFound(id) => write!(f, "landmark not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LandmarkServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LandmarkServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Invalid(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

impl From<LandmarkValidationError> for LandmarkServiceError {
    fn from(value: LandmarkValidationError) -> Self {
        Self::Invalid(value)
    }
}

/// Landmark service facade over a landmark store and a settings store.
///
/// Holds no mutable state of its own; every read is a fresh query.
pub struct LandmarkService<R: LandmarkRepository, S: SettingRepository> {
    landmarks: R,
    settings: S,
}

impl<R: LandmarkRepository, S: SettingRepository> LandmarkService<R, S> {
    /// Creates a service from its two collaborators.
    pub fn new(landmarks: R, settings: S) -> Self {
        Self {
            landmarks,
            settings,
        }
    }

    /// Creates or updates one landmark.
    ///
    /// # Contract
    /// - Name is trimmed; blank names fail with `Invalid(EmptyName)`.
    /// - Exact duplicate names fail with `DuplicateName`.
    /// - Parent must exist and must not be a descendant of this landmark.
    /// - Returns the persisted record with `id` assigned.
    pub fn save_landmark(&self, landmark: &Landmark) -> ServiceResult<Landmark> {
        let mut candidate = landmark.clone();
        candidate.name = candidate.name.trim().to_string();
        candidate.validate()?;

        if self
            .landmarks
            .name_taken(candidate.name.as_str(), candidate.id)?
        {
            return Err(LandmarkServiceError::DuplicateName(candidate.name));
        }

        if let Some(parent_id) = candidate.parent_id {
            self.ensure_parent_allowed(candidate.id, parent_id)?;
        }

        let saved = self.landmarks.save_landmark(&candidate)?;
        debug!(
            "event=landmark_save module=service status=ok id={} created={}",
            saved.serialize_id(),
            candidate.id.is_none()
        );
        Ok(saved)
    }

    pub fn get_landmark(&self, id: LandmarkId) -> ServiceResult<Option<Landmark>> {
        self.landmarks.get_landmark(id).map_err(Into::into)
    }

    pub fn get_landmark_by_name(&self, name: &str) -> ServiceResult<Option<Landmark>> {
        self.landmarks.get_landmark_by_name(name).map_err(Into::into)
    }

    pub fn get_landmark_by_uuid(&self, uuid: Uuid) -> ServiceResult<Option<Landmark>> {
        self.landmarks.get_landmark_by_uuid(uuid).map_err(Into::into)
    }

    /// Lists every landmark, retired ones last.
    pub fn get_all_landmarks(&self) -> ServiceResult<Vec<Landmark>> {
        self.list_landmarks(true)
    }

    pub fn list_landmarks(&self, include_retired: bool) -> ServiceResult<Vec<Landmark>> {
        self.landmarks
            .list_landmarks(include_retired)
            .map_err(Into::into)
    }

    /// Prefix search over active landmarks, unpaginated.
    pub fn get_landmarks(&self, name_prefix: &str) -> ServiceResult<Vec<Landmark>> {
        self.search_landmarks(name_prefix, false, None, None)
    }

    /// Prefix search with retired filter and optional pagination.
    pub fn search_landmarks(
        &self,
        name_prefix: &str,
        include_retired: bool,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<Landmark>> {
        let query = LandmarkSearch {
            name_prefix: Some(name_prefix.to_string()),
            include_retired,
            offset,
            limit,
        };
        self.landmarks.search_landmarks(&query).map_err(Into::into)
    }

    /// Counts landmarks matching the same filter as `search_landmarks`.
    pub fn count_landmarks(&self, name_prefix: &str, include_retired: bool) -> ServiceResult<u64> {
        self.landmarks
            .count_landmarks(Some(name_prefix), include_retired)
            .map_err(Into::into)
    }

    pub fn get_root_landmarks(&self, include_retired: bool) -> ServiceResult<Vec<Landmark>> {
        self.landmarks
            .list_root_landmarks(include_retired)
            .map_err(Into::into)
    }

    pub fn get_child_landmarks(
        &self,
        parent_id: LandmarkId,
        include_retired: bool,
    ) -> ServiceResult<Vec<Landmark>> {
        self.landmarks
            .list_child_landmarks(parent_id, include_retired)
            .map_err(Into::into)
    }

    /// Retires one landmark with a mandatory reason.
    pub fn retire_landmark(&self, landmark: &Landmark, reason: &str) -> ServiceResult<Landmark> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LandmarkServiceError::MissingRetireReason);
        }

        let mut retired = landmark.clone();
        retired.retire(reason);
        let saved = self.save_landmark(&retired)?;
        info!(
            "event=landmark_retire module=service status=ok id={}",
            saved.serialize_id()
        );
        Ok(saved)
    }

    /// Clears the retired flag. The stored reason stays as history.
    pub fn unretire_landmark(&self, landmark: &Landmark) -> ServiceResult<Landmark> {
        let mut restored = landmark.clone();
        restored.unretire();
        let saved = self.save_landmark(&restored)?;
        info!(
            "event=landmark_unretire module=service status=ok id={}",
            saved.serialize_id()
        );
        Ok(saved)
    }

    /// Permanently deletes one landmark.
    ///
    /// No guard beyond storage constraints: callers confirm intent first.
    /// A landmark that still has children fails with a storage constraint
    /// error and is left untouched.
    pub fn purge_landmark(&self, landmark: &Landmark) -> ServiceResult<()> {
        let id = landmark.id.ok_or(LandmarkServiceError::Unsaved)?;
        self.landmarks.delete_landmark(id)?;
        info!("event=landmark_purge module=service status=ok id={id}");
        Ok(())
    }

    /// Returns the saved address template, or the built-in default when
    /// nothing (or only whitespace) was saved.
    pub fn get_address_template(&self) -> ServiceResult<String> {
        let stored = self.settings.get_setting(ADDRESS_TEMPLATE_SETTING_KEY)?;
        Ok(stored
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADDRESS_TEMPLATE.to_string()))
    }

    /// Saves the address template verbatim.
    pub fn save_address_template(&self, xml: &str) -> ServiceResult<()> {
        if xml.trim().is_empty() {
            return Err(LandmarkServiceError::EmptyAddressTemplate);
        }
        self.settings
            .set_setting(ADDRESS_TEMPLATE_SETTING_KEY, xml)?;
        info!(
            "event=address_template_save module=service status=ok bytes={}",
            xml.len()
        );
        Ok(())
    }

    fn ensure_parent_allowed(
        &self,
        landmark_id: Option<LandmarkId>,
        parent_id: LandmarkId,
    ) -> ServiceResult<()> {
        if self.landmarks.get_landmark(parent_id)?.is_none() {
            return Err(LandmarkServiceError::ParentNotFound(parent_id));
        }

        if let Some(landmark_id) = landmark_id {
            if self.would_create_cycle(landmark_id, parent_id)? {
                return Err(LandmarkServiceError::CycleDetected {
                    landmark_id,
                    parent_id,
                });
            }
        }
        Ok(())
    }

    fn would_create_cycle(
        &self,
        landmark_id: LandmarkId,
        candidate_parent_id: LandmarkId,
    ) -> ServiceResult<bool> {
        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == landmark_id || !visited.insert(current) {
                return Ok(true);
            }
            cursor = match self.landmarks.get_landmark(current)? {
                Some(ancestor) => ancestor.parent_id,
                None => None,
            };
        }
        Ok(false)
    }
}
