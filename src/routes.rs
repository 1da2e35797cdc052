//! Role→destination table.
//!
//! Every role has exactly one canonical landing route. Guards redirect
//! wrong-role users there rather than to a generic page, which would loop.

use crate::models::Role;

pub const LOGIN: &str = "/login";
pub const PORTAL_SELECT: &str = "/portal";
pub const SALES_DASHBOARD: &str = "/sales-dashboard";
pub const CONTRACTOR_DASHBOARD: &str = "/contractor-dashboard";
pub const ADMIN_DASHBOARD: &str = "/admin-dashboard";

/// Canonical destination for a role; anonymous users land on the login page.
#[must_use]
pub fn canonical_destination(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Salesperson) => SALES_DASHBOARD,
        Some(Role::Contractor) => CONTRACTOR_DASHBOARD,
        Some(Role::Admin) => ADMIN_DASHBOARD,
        None => LOGIN,
    }
}

/// Where to go after login: the server's suggestion if it is a local path,
/// else the role's canonical destination.
#[must_use]
pub fn post_login_target(server_redirect: Option<&str>, role: Role) -> String {
    match server_redirect.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_owned(),
        _ => canonical_destination(Some(role)).to_owned(),
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
