use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::UserId;
use crate::forms::{required_text, FormErrors};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_type!(
    /// Identifier for a tenant-level grouping of properties.
    OrganizationId
);
id_type!(
    /// Identifier for a managed real-estate unit.
    PropertyId
);
id_type!(MaintenanceRequestId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePriority {
    Low,
    Normal,
    Urgent,
}

impl MaintenancePriority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Normal, Self::Urgent];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Urgent => "urgent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::Urgent => "Urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == value.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    Open,
    InProgress,
    Resolved,
}

impl MaintenanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In progress",
            Self::Resolved => "Resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: MaintenanceRequestId,
    pub property_id: PropertyId,
    pub title: String,
    pub description: String,
    pub priority: MaintenancePriority,
    pub status: MaintenanceStatus,
    pub created_at: DateTime<Utc>,
}

pub const NAME_MAX_LEN: usize = 100;
pub const ADDRESS_MAX_LEN: usize = 200;
pub const TITLE_MAX_LEN: usize = 120;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewOrganizationForm {
    #[serde(default)]
    pub name: String,
}

impl NewOrganizationForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let name = required_text(&mut errors, "name", "Name", &self.name, NAME_MAX_LEN);
        errors.into_result(name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPropertyForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl NewPropertyForm {
    /// Returns the trimmed `(name, address)` pair.
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let name = required_text(&mut errors, "name", "Name", &self.name, NAME_MAX_LEN);
        let address = required_text(
            &mut errors,
            "address",
            "Address",
            &self.address,
            ADDRESS_MAX_LEN,
        );
        errors.into_result((name, address))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMaintenanceRequestForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: String,
}

/// Validated maintenance request input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceDraft {
    pub title: String,
    pub description: String,
    pub priority: MaintenancePriority,
}

impl NewMaintenanceRequestForm {
    pub fn validate(&self) -> Result<MaintenanceDraft, FormErrors> {
        let mut errors = FormErrors::new();
        let title = required_text(&mut errors, "title", "Title", &self.title, TITLE_MAX_LEN);

        let description = self.description.trim().to_string();
        if description.chars().count() > DESCRIPTION_MAX_LEN {
            errors.add_field(
                "description",
                format!("Description must be at most {DESCRIPTION_MAX_LEN} characters"),
            );
        }

        let priority = if self.priority.trim().is_empty() {
            Some(MaintenancePriority::Normal)
        } else {
            MaintenancePriority::parse(&self.priority)
        };
        let Some(priority) = priority else {
            errors.add_field("priority", "Priority must be low, normal, or urgent");
            return Err(errors);
        };

        errors.into_result(MaintenanceDraft {
            title,
            description,
            priority,
        })
    }
}
