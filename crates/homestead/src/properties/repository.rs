use super::domain::{
    MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus, Organization, OrganizationId,
    Property, PropertyId,
};
use crate::accounts::{RepositoryError, UserId};

/// Storage abstraction for organizations and everything nested under them.
pub trait OrganizationRepository: Send + Sync {
    fn insert_organization(&self, organization: Organization)
        -> Result<Organization, RepositoryError>;
    fn fetch_organization(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError>;
    /// Organizations owned by the user, oldest first.
    fn organizations_for_owner(&self, owner: &UserId)
        -> Result<Vec<Organization>, RepositoryError>;

    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError>;
    fn fetch_property(&self, id: &PropertyId) -> Result<Option<Property>, RepositoryError>;
    /// Properties of the organization, oldest first.
    fn properties_for_organization(
        &self,
        organization: &OrganizationId,
    ) -> Result<Vec<Property>, RepositoryError>;

    fn insert_maintenance_request(
        &self,
        request: MaintenanceRequest,
    ) -> Result<MaintenanceRequest, RepositoryError>;
    /// Requests raised against the property, newest first.
    fn maintenance_requests_for_property(
        &self,
        property: &PropertyId,
    ) -> Result<Vec<MaintenanceRequest>, RepositoryError>;
    fn fetch_maintenance_request(
        &self,
        id: &MaintenanceRequestId,
    ) -> Result<Option<MaintenanceRequest>, RepositoryError>;
    fn update_maintenance_status(
        &self,
        id: &MaintenanceRequestId,
        status: MaintenanceStatus,
    ) -> Result<(), RepositoryError>;
}
