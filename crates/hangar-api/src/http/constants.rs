//! Shared HTTP constants (headers, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_MIME_TYPE: &str = "x-mime-type";

pub(crate) const PROBLEM_INTERNAL: &str = "https://hangar.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://hangar.dev/problems/bad-request";
pub(crate) const PROBLEM_INVALID_INPUT: &str = "https://hangar.dev/problems/invalid-input";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://hangar.dev/problems/not-found";
pub(crate) const PROBLEM_CONFLICT: &str = "https://hangar.dev/problems/conflict";
