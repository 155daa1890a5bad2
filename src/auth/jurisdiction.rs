//! Location matching
//!
//! Two location strings denote the same jurisdiction when they are equal
//! after trimming surrounding whitespace and lowercasing. Every comparison
//! site (guards, listings, reports, stored `location_key` fields) goes
//! through [`normalize_location`]; there is no substring matching.

/// Normalize a free-text location into its comparison key
pub fn normalize_location(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Whether two locations denote the same jurisdiction
pub fn same_jurisdiction(a: &str, b: &str) -> bool {
    let a = normalize_location(a);
    !a.is_empty() && a == normalize_location(b)
}
