use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::error;

use super::domain::{
    MaintenanceRequestId, NewMaintenanceRequestForm, NewOrganizationForm, NewPropertyForm,
    OrganizationId, PropertyId,
};
use super::service::PropertyServiceError;
use super::views;
use crate::accounts::EmailSender;
use crate::forms::FormErrors;
use crate::html;
use crate::web::{PortalState, PortalStore};

/// Router builder exposing organization, property, and maintenance pages.
pub fn property_router<S, M>(state: Arc<PortalState<S, M>>) -> Router
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    Router::new()
        .route(
            "/organizations",
            get(organizations_page::<S, M>).post(create_organization_handler::<S, M>),
        )
        .route(
            "/organizations/:organization_id/properties",
            get(properties_page::<S, M>).post(create_property_handler::<S, M>),
        )
        .route(
            "/organizations/:organization_id/properties/:property_id/maintenance",
            get(maintenance_page::<S, M>).post(create_maintenance_handler::<S, M>),
        )
        .route(
            "/organizations/:organization_id/properties/:property_id/maintenance/:request_id/status",
            post(maintenance_status_handler::<S, M>),
        )
        .with_state(state)
}

fn failure(err: PropertyServiceError) -> Response {
    match err {
        PropertyServiceError::NotFound => html::not_found(),
        PropertyServiceError::Validation(errors) => {
            html::page(StatusCode::BAD_REQUEST, "Invalid request", &errors.to_string())
        }
        PropertyServiceError::Repository(err) => {
            error!(error = %err, "property storage failed");
            html::server_error()
        }
    }
}

pub(crate) async fn organizations_page<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, views::organizations_path()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.properties.organizations(&user) {
        Ok(organizations) => views::organizations(
            StatusCode::OK,
            &organizations,
            &NewOrganizationForm::default(),
            &FormErrors::new(),
        ),
        Err(err) => failure(err),
    }
}

/// Create an organization and land on its (empty) property list.
pub(crate) async fn create_organization_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    Form(form): Form<NewOrganizationForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, views::organizations_path()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.properties.create_organization(&user, &form, Utc::now()) {
        Ok(organization) => Redirect::to(&views::properties_path(&organization)).into_response(),
        Err(PropertyServiceError::Validation(errors)) => {
            match state.properties.organizations(&user) {
                Ok(organizations) => views::organizations(
                    StatusCode::BAD_REQUEST,
                    &organizations,
                    &form,
                    &errors,
                ),
                Err(err) => failure(err),
            }
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn properties_page<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    uri: Uri,
    Path(organization_id): Path<String>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, uri.path()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state
        .properties
        .properties(&user, &OrganizationId(organization_id))
    {
        Ok((organization, properties)) => views::properties(
            StatusCode::OK,
            &organization,
            &properties,
            &NewPropertyForm::default(),
            &FormErrors::new(),
        ),
        Err(err) => failure(err),
    }
}

pub(crate) async fn create_property_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    uri: Uri,
    Path(organization_id): Path<String>,
    Form(form): Form<NewPropertyForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, uri.path()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let organization_id = OrganizationId(organization_id);
    match state
        .properties
        .create_property(&user, &organization_id, &form, Utc::now())
    {
        Ok(_) => Redirect::to(uri.path()).into_response(),
        Err(PropertyServiceError::Validation(errors)) => {
            match state.properties.properties(&user, &organization_id) {
                Ok((organization, properties)) => views::properties(
                    StatusCode::BAD_REQUEST,
                    &organization,
                    &properties,
                    &form,
                    &errors,
                ),
                Err(err) => failure(err),
            }
        }
        Err(err) => failure(err),
    }
}

pub(crate) async fn maintenance_page<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    uri: Uri,
    Path((organization_id, property_id)): Path<(String, String)>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, uri.path()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.properties.maintenance_requests(
        &user,
        &OrganizationId(organization_id),
        &PropertyId(property_id),
    ) {
        Ok((organization, property, requests)) => views::maintenance(
            StatusCode::OK,
            &organization,
            &property,
            &requests,
            &NewMaintenanceRequestForm::default(),
            &FormErrors::new(),
        ),
        Err(err) => failure(err),
    }
}

pub(crate) async fn create_maintenance_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    uri: Uri,
    Path((organization_id, property_id)): Path<(String, String)>,
    Form(form): Form<NewMaintenanceRequestForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let user = match state.require_user(&headers, uri.path()) {
        Ok(user) => user,
        Err(response) => return response,
    };
    let organization_id = OrganizationId(organization_id);
    let property_id = PropertyId(property_id);
    match state.properties.create_maintenance_request(
        &user,
        &organization_id,
        &property_id,
        &form,
        Utc::now(),
    ) {
        Ok(_) => Redirect::to(uri.path()).into_response(),
        Err(PropertyServiceError::Validation(errors)) => {
            match state
                .properties
                .maintenance_requests(&user, &organization_id, &property_id)
            {
                Ok((organization, property, requests)) => views::maintenance(
                    StatusCode::BAD_REQUEST,
                    &organization,
                    &property,
                    &requests,
                    &form,
                    &errors,
                ),
                Err(err) => failure(err),
            }
        }
        Err(err) => failure(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusForm {
    #[serde(default)]
    status: String,
}

pub(crate) async fn maintenance_status_handler<S, M>(
    State(state): State<Arc<PortalState<S, M>>>,
    headers: HeaderMap,
    Path((organization_id, property_id, request_id)): Path<(String, String, String)>,
    Form(form): Form<StatusForm>,
) -> Response
where
    S: PortalStore,
    M: EmailSender + 'static,
{
    let organization_id = OrganizationId(organization_id);
    let property_id = PropertyId(property_id);
    let list_path = format!(
        "/organizations/{organization_id}/properties/{property_id}/maintenance"
    );
    let user = match state.require_user(&headers, &list_path) {
        Ok(user) => user,
        Err(response) => return response,
    };
    match state.properties.update_maintenance_status(
        &user,
        &organization_id,
        &property_id,
        &MaintenanceRequestId(request_id),
        &form.status,
    ) {
        Ok(_) => Redirect::to(&list_path).into_response(),
        Err(err) => failure(err),
    }
}
