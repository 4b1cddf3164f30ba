use axum::http::StatusCode;
use axum::response::Response;

use super::domain::{
    MaintenancePriority, MaintenanceRequest, MaintenanceStatus, NewMaintenanceRequestForm,
    NewOrganizationForm, NewPropertyForm, Organization, Property,
};
use crate::forms::FormErrors;
use crate::html::{error_list, escape, input_field, page};

pub(super) fn organizations_path() -> &'static str {
    "/organizations"
}

pub(super) fn properties_path(organization: &Organization) -> String {
    format!("/organizations/{}/properties", organization.id)
}

pub(super) fn maintenance_path(organization: &Organization, property: &Property) -> String {
    format!(
        "/organizations/{}/properties/{}/maintenance",
        organization.id, property.id
    )
}

pub(super) fn organizations(
    status: StatusCode,
    organizations: &[Organization],
    form: &NewOrganizationForm,
    errors: &FormErrors,
) -> Response {
    let list = if organizations.is_empty() {
        "<p>You don't belong to any organizations yet.</p>".to_string()
    } else {
        let items: String = organizations
            .iter()
            .map(|organization| {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    properties_path(organization),
                    escape(&organization.name)
                )
            })
            .collect();
        format!("<ul id=\"organizations\">{items}</ul>")
    };

    let body = format!(
        "<h1>Organizations</h1>\n{list}\n<h2>Create an organization</h2>\n\
         <form method=\"post\" action=\"{action}\">\n{name}\n{form_errors}\n\
         <button type=\"submit\">Create organization</button>\n</form>",
        action = organizations_path(),
        name = input_field("Name", "name", "text", &form.name, errors.for_field("name")),
        form_errors = error_list("organization-form-errors", errors.form_errors()),
    );
    page(status, "Organizations", &body)
}

pub(super) fn properties(
    status: StatusCode,
    organization: &Organization,
    properties: &[Property],
    form: &NewPropertyForm,
    errors: &FormErrors,
) -> Response {
    let list = if properties.is_empty() {
        "<p>No properties yet.</p>".to_string()
    } else {
        let items: String = properties
            .iter()
            .map(|property| {
                format!(
                    "<li><a href=\"{}\">{}</a> <span class=\"address\">{}</span></li>",
                    maintenance_path(organization, property),
                    escape(&property.name),
                    escape(&property.address)
                )
            })
            .collect();
        format!("<ul id=\"properties\">{items}</ul>")
    };

    let body = format!(
        "<h1>{name} properties</h1>\n{list}\n<h2>Add a property</h2>\n\
         <form method=\"post\" action=\"{action}\">\n{name_field}\n{address_field}\n{form_errors}\n\
         <button type=\"submit\">Add property</button>\n</form>",
        name = escape(&organization.name),
        action = properties_path(organization),
        name_field = input_field("Name", "name", "text", &form.name, errors.for_field("name")),
        address_field = input_field(
            "Address",
            "address",
            "text",
            &form.address,
            errors.for_field("address")
        ),
        form_errors = error_list("property-form-errors", errors.form_errors()),
    );
    page(status, &format!("{} properties", organization.name), &body)
}

pub(super) fn maintenance(
    status: StatusCode,
    organization: &Organization,
    property: &Property,
    requests: &[MaintenanceRequest],
    form: &NewMaintenanceRequestForm,
    errors: &FormErrors,
) -> Response {
    let base = maintenance_path(organization, property);
    let list = if requests.is_empty() {
        "<p>No maintenance requests.</p>".to_string()
    } else {
        let items: String = requests
            .iter()
            .map(|request| maintenance_item(&base, request))
            .collect();
        format!("<ul id=\"maintenance-requests\">{items}</ul>")
    };

    let selected = if form.priority.is_empty() {
        MaintenancePriority::Normal.as_str()
    } else {
        form.priority.as_str()
    };
    let options: String = MaintenancePriority::ALL
        .into_iter()
        .map(|priority| {
            let flag = if priority.as_str() == selected {
                " selected"
            } else {
                ""
            };
            format!(
                "<option value=\"{}\"{flag}>{}</option>",
                priority.as_str(),
                priority.label()
            )
        })
        .collect();

    let body = format!(
        "<p><a href=\"{back}\">{org}</a></p>\n<h1>{property}</h1>\n<p>{address}</p>\n\
         <h2>Maintenance requests</h2>\n{list}\n<h2>New request</h2>\n\
         <form method=\"post\" action=\"{base}\">\n{title}\n\
         <div class=\"field\">\n<label for=\"description\">Description</label>\n\
         <textarea id=\"description\" name=\"description\">{description}</textarea>\n{description_errors}\n</div>\n\
         <div class=\"field\">\n<label for=\"priority\">Priority</label>\n\
         <select id=\"priority\" name=\"priority\">{options}</select>\n{priority_errors}\n</div>\n\
         {form_errors}\n<button type=\"submit\">Submit request</button>\n</form>",
        back = properties_path(organization),
        org = escape(&organization.name),
        property = escape(&property.name),
        address = escape(&property.address),
        title = input_field("Title", "title", "text", &form.title, errors.for_field("title")),
        description = escape(&form.description),
        description_errors = error_list("description-errors", errors.for_field("description")),
        priority_errors = error_list("priority-errors", errors.for_field("priority")),
        form_errors = error_list("maintenance-form-errors", errors.form_errors()),
    );
    page(status, &property.name, &body)
}

fn maintenance_item(base: &str, request: &MaintenanceRequest) -> String {
    let next = match request.status {
        MaintenanceStatus::Open => Some(MaintenanceStatus::InProgress),
        MaintenanceStatus::InProgress => Some(MaintenanceStatus::Resolved),
        MaintenanceStatus::Resolved => None,
    };
    let action = next
        .map(|status| {
            format!(
                "<form method=\"post\" action=\"{base}/{id}/status\">\
                 <input type=\"hidden\" name=\"status\" value=\"{value}\">\
                 <button type=\"submit\">Mark {label}</button></form>",
                id = request.id,
                value = status.as_str(),
                label = status.label().to_lowercase(),
            )
        })
        .unwrap_or_default();
    let description = if request.description.is_empty() {
        String::new()
    } else {
        format!("<p>{}</p>", escape(&request.description))
    };

    format!(
        "<li><strong>{title}</strong> <span class=\"priority\">{priority}</span> \
         <span class=\"status\">{status}</span>{description}{action}</li>",
        title = escape(&request.title),
        priority = request.priority.label(),
        status = request.status.label(),
    )
}
