//! Privilege vocabulary for landmark operations.
//!
//! The registry does not authorize anything itself: the composing layer
//! checks the privilege returned by [`LandmarkOperation::required_privilege`]
//! before invoking the service.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Named capability a caller must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    ViewLandmarks,
    ManageLandmarks,
    PurgeLandmarks,
    ManageAddressTemplates,
}

pub const PRIV_VIEW_LANDMARKS: &str = "View Landmarks";
pub const PRIV_MANAGE_LANDMARKS: &str = "Manage Landmarks";
pub const PRIV_PURGE_LANDMARKS: &str = "Purge Landmarks";
pub const PRIV_MANAGE_ADDRESS_TEMPLATES: &str = "Manage Address Templates";

impl Privilege {
    pub const ALL: [Privilege; 4] = [
        Self::ViewLandmarks,
        Self::ManageLandmarks,
        Self::PurgeLandmarks,
        Self::ManageAddressTemplates,
    ];

    /// Stable name as stored in role grants.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ViewLandmarks => PRIV_VIEW_LANDMARKS,
            Self::ManageLandmarks => PRIV_MANAGE_LANDMARKS,
            Self::PurgeLandmarks => PRIV_PURGE_LANDMARKS,
            Self::ManageAddressTemplates => PRIV_MANAGE_ADDRESS_TEMPLATES,
        }
    }
}

impl Display for Privilege {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a privilege from its stable name. Matching is exact.
pub fn parse_privilege(value: &str) -> Result<Privilege, PrivilegeError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(PrivilegeError::Empty);
    }
    Privilege::ALL
        .into_iter()
        .find(|privilege| privilege.as_str() == normalized)
        .ok_or_else(|| PrivilegeError::Unknown(normalized.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeError {
    Empty,
    Unknown(String),
}

impl Display for PrivilegeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "privilege name must not be empty"),
            Self::Unknown(value) => write!(f, "unknown privilege: {value}"),
        }
    }
}

impl Error for PrivilegeError {}

/// Service operations, grouped by the privilege they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandmarkOperation {
    Save,
    Get,
    List,
    Search,
    Count,
    ListRoots,
    ListChildren,
    Retire,
    Unretire,
    Purge,
    GetAddressTemplate,
    SaveAddressTemplate,
}

impl LandmarkOperation {
    pub const ALL: [LandmarkOperation; 12] = [
        Self::Save,
        Self::Get,
        Self::List,
        Self::Search,
        Self::Count,
        Self::ListRoots,
        Self::ListChildren,
        Self::Retire,
        Self::Unretire,
        Self::Purge,
        Self::GetAddressTemplate,
        Self::SaveAddressTemplate,
    ];

    /// Stable snake_case operation name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Get => "get",
            Self::List => "list",
            Self::Search => "search",
            Self::Count => "count",
            Self::ListRoots => "list_roots",
            Self::ListChildren => "list_children",
            Self::Retire => "retire",
            Self::Unretire => "unretire",
            Self::Purge => "purge",
            Self::GetAddressTemplate => "get_address_template",
            Self::SaveAddressTemplate => "save_address_template",
        }
    }

    pub fn required_privilege(self) -> Privilege {
        match self {
            Self::Get
            | Self::List
            | Self::Search
            | Self::Count
            | Self::ListRoots
            | Self::ListChildren
            | Self::GetAddressTemplate => Privilege::ViewLandmarks,
            Self::Save | Self::Retire | Self::Unretire => Privilege::ManageLandmarks,
            Self::Purge => Privilege::PurgeLandmarks,
            Self::SaveAddressTemplate => Privilege::ManageAddressTemplates,
        }
    }
}
