//! Typed identity wrappers for organizations, repositories, and tokens.
//!
//! Stringly typed parameters are easy to swap by accident; these wrappers
//! validate once at the boundary and make the rest of the pipeline
//! impossible to miscall.

use super::error::ApiError;

/// GitHub organization name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationName(String);

impl OrganizationName {
    /// Validates that the organization name is non-blank.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingOrganization`] when the value is blank.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ApiError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ApiError::MissingOrganization);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the organization name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository identifier in `owner/name` form, unique within a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryFullName(String);

impl RepositoryFullName {
    /// Validates an `owner/name` identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] when either segment is missing or
    /// blank.
    pub fn new(value: impl AsRef<str>) -> Result<Self, ApiError> {
        let raw = value.as_ref().trim();
        let Some((owner, name)) = raw.split_once('/') else {
            return Err(ApiError::InvalidUrl(format!(
                "repository identifier must be owner/name, got {raw:?}"
            )));
        };
        if owner.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidUrl(format!(
                "repository identifier must be owner/name, got {raw:?}"
            )));
        }
        Ok(Self(raw.to_owned()))
    }

    /// Borrow the full `owner/name` identifier.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The owner segment.
    #[must_use]
    pub fn owner(&self) -> &str {
        self.0.split_once('/').map_or("", |(owner, _)| owner)
    }

    /// The repository-name segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, name)| name)
    }
}

impl std::fmt::Display for RepositoryFullName {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MissingToken`] when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, ApiError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ApiError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for PersonalAccessToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens must never leak through Debug output or logs.
        formatter.write_str("PersonalAccessToken(***)")
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}
