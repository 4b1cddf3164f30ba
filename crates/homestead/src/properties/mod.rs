//! Organizations, the properties they manage, and maintenance requests
//! raised against those properties.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
mod views;


pub use domain::{
    MaintenancePriority, MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus,
    NewMaintenanceRequestForm, NewOrganizationForm, NewPropertyForm, Organization, OrganizationId,
    Property, PropertyId,
};
pub use repository::OrganizationRepository;
pub use router::property_router;
pub use service::{PropertyService, PropertyServiceError};
