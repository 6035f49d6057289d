//! HTTP handlers, one module per resource.
//!
//! Every handler reconstructs the caller's [`SessionContext`] from the bearer
//! token and checks the role allow-list before touching a service. Listing
//! endpoints accept optional query filters applied in-memory, after the scan.

pub mod auth;
pub mod companies;
pub mod data;
pub mod locations;
pub mod logs;
pub mod medicines;
pub mod operations;

/// Case-insensitive substring match used by the listing filters.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn opt_contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.map_or(false, |h| contains_ci(h, needle))
}
