use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::domain::{
    MaintenanceRequest, MaintenanceRequestId, MaintenanceStatus, NewMaintenanceRequestForm,
    NewOrganizationForm, NewPropertyForm, Organization, OrganizationId, Property, PropertyId,
};
use super::repository::OrganizationRepository;
use crate::accounts::{RepositoryError, User};
use crate::forms::FormErrors;

/// Error raised by the property service.
#[derive(Debug, thiserror::Error)]
pub enum PropertyServiceError {
    #[error("invalid submission: {0}")]
    Validation(FormErrors),
    /// Missing, or owned by someone else. The two are indistinguishable to callers.
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Organization-scoped access to properties and maintenance requests.
pub struct PropertyService<R> {
    repository: Arc<R>,
}

impl<R> PropertyService<R>
where
    R: OrganizationRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn create_organization(
        &self,
        owner: &User,
        form: &NewOrganizationForm,
        now: DateTime<Utc>,
    ) -> Result<Organization, PropertyServiceError> {
        let name = form.validate().map_err(PropertyServiceError::Validation)?;
        let organization = self.repository.insert_organization(Organization {
            id: OrganizationId::generate(),
            name,
            owner_id: owner.id.clone(),
            created_at: now,
        })?;
        info!(organization_id = %organization.id, owner_id = %owner.id, "organization created");
        Ok(organization)
    }

    pub fn organizations(&self, owner: &User) -> Result<Vec<Organization>, PropertyServiceError> {
        Ok(self.repository.organizations_for_owner(&owner.id)?)
    }

    pub fn organization(
        &self,
        owner: &User,
        id: &OrganizationId,
    ) -> Result<Organization, PropertyServiceError> {
        match self.repository.fetch_organization(id)? {
            Some(organization) if organization.owner_id == owner.id => Ok(organization),
            _ => Err(PropertyServiceError::NotFound),
        }
    }

    pub fn properties(
        &self,
        owner: &User,
        organization_id: &OrganizationId,
    ) -> Result<(Organization, Vec<Property>), PropertyServiceError> {
        let organization = self.organization(owner, organization_id)?;
        let properties = self
            .repository
            .properties_for_organization(&organization.id)?;
        Ok((organization, properties))
    }

    pub fn create_property(
        &self,
        owner: &User,
        organization_id: &OrganizationId,
        form: &NewPropertyForm,
        now: DateTime<Utc>,
    ) -> Result<Property, PropertyServiceError> {
        let organization = self.organization(owner, organization_id)?;
        let (name, address) = form.validate().map_err(PropertyServiceError::Validation)?;
        let property = self.repository.insert_property(Property {
            id: PropertyId::generate(),
            organization_id: organization.id,
            name,
            address,
            created_at: now,
        })?;
        info!(property_id = %property.id, "property created");
        Ok(property)
    }

    pub fn property(
        &self,
        owner: &User,
        organization_id: &OrganizationId,
        property_id: &PropertyId,
    ) -> Result<(Organization, Property), PropertyServiceError> {
        let organization = self.organization(owner, organization_id)?;
        match self.repository.fetch_property(property_id)? {
            Some(property) if property.organization_id == organization.id => {
                Ok((organization, property))
            }
            _ => Err(PropertyServiceError::NotFound),
        }
    }

    pub fn maintenance_requests(
        &self,
        owner: &User,
        organization_id: &OrganizationId,
        property_id: &PropertyId,
    ) -> Result<(Organization, Property, Vec<MaintenanceRequest>), PropertyServiceError> {
        let (organization, property) = self.property(owner, organization_id, property_id)?;
        let requests = self
            .repository
            .maintenance_requests_for_property(&property.id)?;
        Ok((organization, property, requests))
    }

    pub fn create_maintenance_request(
        &self,
        owner: &User,
        organization_id: &OrganizationId,
        property_id: &PropertyId,
        form: &NewMaintenanceRequestForm,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceRequest, PropertyServiceError> {
        let (_, property) = self.property(owner, organization_id, property_id)?;
        let draft = form.validate().map_err(PropertyServiceError::Validation)?;
        let request = self
            .repository
            .insert_maintenance_request(MaintenanceRequest {
                id: MaintenanceRequestId::generate(),
                property_id: property.id,
                title: draft.title,
                description: draft.description,
                priority: draft.priority,
                status: MaintenanceStatus::Open,
                created_at: now,
            })?;
        info!(
            request_id = %request.id,
            priority = request.priority.as_str(),
            "maintenance request opened"
        );
        Ok(request)
    }

    pub fn update_maintenance_status(
        &self,
        owner: &User,
        organization_id: &OrganizationId,
        property_id: &PropertyId,
        request_id: &MaintenanceRequestId,
        status: &str,
    ) -> Result<MaintenanceStatus, PropertyServiceError> {
        let (_, property) = self.property(owner, organization_id, property_id)?;
        let status = MaintenanceStatus::parse(status.trim()).ok_or_else(|| {
            PropertyServiceError::Validation(FormErrors::field("status", "Unknown status"))
        })?;

        match self.repository.fetch_maintenance_request(request_id)? {
            Some(request) if request.property_id == property.id => {}
            _ => return Err(PropertyServiceError::NotFound),
        }
        self.repository
            .update_maintenance_status(request_id, status)?;
        info!(request_id = %request_id, status = status.as_str(), "maintenance status updated");
        Ok(status)
    }
}
