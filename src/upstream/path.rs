//! Registry API path classification

use crate::error::ParseError;

/// Kind of registry API request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryRequestType {
    /// `GET /v2/`
    VersionCheck,
    /// `GET /v2/_catalog`
    Catalog,
    /// `GET /v2/{name}/tags/list`
    TagList,
    /// `GET /v2/{name}/manifests/{reference}`
    Manifest,
    /// `GET /v2/{name}/blobs/{digest}`
    Blob,
}

impl RegistryRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryRequestType::VersionCheck => "version_check",
            RegistryRequestType::Catalog => "catalog",
            RegistryRequestType::TagList => "tag_list",
            RegistryRequestType::Manifest => "manifest",
            RegistryRequestType::Blob => "blob",
        }
    }
}

/// A classified registry path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryPath {
    /// Image name, empty for version check and catalog
    pub name: String,

    pub request_type: RegistryRequestType,

    /// Manifest reference or blob digest
    pub reference: Option<String>,
}

impl RegistryPath {
    fn new(name: &str, request_type: RegistryRequestType, reference: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            request_type,
            reference: reference.map(|r| r.to_string()),
        }
    }
}

/// Classify a `/v2/...` request path
///
/// Image names may contain `/` (e.g. `library/nginx`, `team/app/api`).
///
/// # Example
///
/// ```
/// use registry_auth_relay::upstream::{parse_registry_path, RegistryRequestType};
///
/// let parsed = parse_registry_path("/v2/library/nginx/manifests/latest").unwrap();
/// assert_eq!(parsed.name, "library/nginx");
/// assert_eq!(parsed.request_type, RegistryRequestType::Manifest);
/// assert_eq!(parsed.reference.as_deref(), Some("latest"));
/// ```
pub fn parse_registry_path(path: &str) -> Result<RegistryPath, ParseError> {
    let rest = path
        .strip_prefix("/v2")
        .ok_or_else(|| ParseError::InvalidPath(path.to_string()))?
        .trim_start_matches('/');

    if rest.is_empty() {
        return Ok(RegistryPath::new("", RegistryRequestType::VersionCheck, None));
    }

    if rest == "_catalog" {
        return Ok(RegistryPath::new("", RegistryRequestType::Catalog, None));
    }

    if let Some(name) = rest.strip_suffix("/tags/list") {
        if !name.is_empty() {
            return Ok(RegistryPath::new(name, RegistryRequestType::TagList, None));
        }
    }

    for (marker, request_type) in [
        ("/manifests/", RegistryRequestType::Manifest),
        ("/blobs/", RegistryRequestType::Blob),
    ] {
        if let Some(pos) = rest.rfind(marker) {
            let name = &rest[..pos];
            let reference = &rest[pos + marker.len()..];
            if !name.is_empty() && !reference.is_empty() && !reference.contains('/') {
                return Ok(RegistryPath::new(name, request_type, Some(reference)));
            }
        }
    }

    Err(ParseError::InvalidPath(path.to_string()))
}
