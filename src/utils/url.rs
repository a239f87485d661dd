//! URL utilities for consistent URL handling
//!
//! This module provides utilities for normalizing URLs to prevent issues
//! with trailing slashes when constructing backend endpoints.

/// Normalize a base URL by removing trailing slashes
///
/// This ensures consistent URL construction when appending endpoints,
/// preventing double slashes in the final URLs.
///
/// # Examples
///
/// ```
/// use atelier::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:5000"), "http://localhost:5000");
/// assert_eq!(normalize_base_url("http://localhost:5000/"), "http://localhost:5000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Construct a complete endpoint URL from a base URL and a path
///
/// This function normalizes the base URL and safely appends the path,
/// ensuring there are no double slashes in the result.
///
/// # Examples
///
/// ```
/// use atelier::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:5000", "messages"),
///     "http://localhost:5000/messages"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:5000/", "/models"),
///     "http://localhost:5000/models"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
