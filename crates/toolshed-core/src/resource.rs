//! Resources: reusable HTTP or SQL connection templates shared by many Apps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::Aggregate;
use crate::conflict::{BoundAppParameters, ConflictValidator};
use crate::error::{DomainError, Result};
use crate::ids::ResourceId;
use crate::parameters::{ParameterCategory, ParameterChanges, ParameterSet};

pub const NAME_MAX_CHARS: usize = 100;
pub const BASE_URL_MAX_CHARS: usize = 2048;

pub type ResourceAggregate = Aggregate<Resource, ResourceEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Http,
    Sql,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Sql => "sql",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawHttpResourceConfig")]
pub struct HttpResourceConfig {
    base_url: String,
    #[serde(flatten)]
    parameters: ParameterSet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHttpResourceConfig {
    base_url: String,
    #[serde(flatten)]
    parameters: ParameterSet,
}

impl TryFrom<RawHttpResourceConfig> for HttpResourceConfig {
    type Error = DomainError;

    fn try_from(raw: RawHttpResourceConfig) -> Result<Self> {
        Ok(Self {
            base_url: validate_base_url(raw.base_url)?,
            parameters: raw.parameters,
        })
    }
}

impl HttpResourceConfig {
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlResourceConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl SqlResourceConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("host", &self.host),
            ("database", &self.database),
            ("username", &self.username),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "sql {field} must not be empty"
                )));
            }
        }
        if self.port == 0 {
            return Err(DomainError::validation("sql port must be > 0"));
        }
        Ok(())
    }
}

/// Kind-specific settings. The two field sets never coexist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceConfig {
    Http(HttpResourceConfig),
    Sql(SqlResourceConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: ResourceId,
    name: String,
    config: ResourceConfig,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceEvent {
    ResourceCreated {
        resource_id: ResourceId,
        name: String,
        kind: ResourceKind,
    },
    ResourceRenamed {
        resource_id: ResourceId,
        name: String,
    },
    BaseUrlChanged {
        resource_id: ResourceId,
        base_url: String,
    },
    HttpParametersChanged {
        resource_id: ResourceId,
        categories: Vec<ParameterCategory>,
    },
    SqlConnectionChanged {
        resource_id: ResourceId,
    },
}

impl Resource {
    /// New HTTP resource. A fresh resource has no bound Apps, so no conflict check applies.
    pub fn create_http(
        name: impl Into<String>,
        base_url: impl Into<String>,
        parameters: ParameterSet,
    ) -> Result<ResourceAggregate> {
        let base_url = validate_base_url(base_url.into())?;
        Self::create(
            name.into(),
            ResourceConfig::Http(HttpResourceConfig {
                base_url,
                parameters,
            }),
        )
    }

    pub fn create_sql(name: impl Into<String>, config: SqlResourceConfig) -> Result<ResourceAggregate> {
        config.validate()?;
        Self::create(name.into(), ResourceConfig::Sql(config))
    }

    fn create(name: String, config: ResourceConfig) -> Result<ResourceAggregate> {
        let name = validate_name(name)?;
        let now = Utc::now();
        let resource = Self {
            id: ResourceId::new(),
            name,
            config,
            created_at: now,
            updated_at: now,
        };
        let event = ResourceEvent::ResourceCreated {
            resource_id: resource.id,
            name: resource.name.clone(),
            kind: resource.kind(),
        };
        debug!(resource_id = %resource.id, kind = resource.kind().as_str(), "resource created");
        Ok(Aggregate::create(resource, vec![event]))
    }

    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        match self.config {
            ResourceConfig::Http(_) => ResourceKind::Http,
            ResourceConfig::Sql(_) => ResourceKind::Sql,
        }
    }

    #[must_use]
    pub fn http(&self) -> Option<&HttpResourceConfig> {
        match &self.config {
            ResourceConfig::Http(http) => Some(http),
            ResourceConfig::Sql(_) => None,
        }
    }

    #[must_use]
    pub fn sql(&self) -> Option<&SqlResourceConfig> {
        match &self.config {
            ResourceConfig::Sql(sql) => Some(sql),
            ResourceConfig::Http(_) => None,
        }
    }

    /// HTTP parameters, or an empty set for SQL resources.
    #[must_use]
    pub fn parameters(&self) -> ParameterSet {
        self.http()
            .map(|http| http.parameters.clone())
            .unwrap_or_default()
    }

    fn require_http(&self, operation: &str) -> Result<&HttpResourceConfig> {
        self.http().ok_or_else(|| {
            DomainError::invalid_operation(format!(
                "cannot {operation} on {} resource {}",
                self.kind().as_str(),
                self.id
            ))
        })
    }

    pub fn rename(aggregate: &ResourceAggregate, name: impl Into<String>) -> Result<ResourceAggregate> {
        let name = validate_name(name.into())?;
        let mut resource = aggregate.state().clone();
        resource.name = name.clone();
        resource.updated_at = Utc::now();
        let event = ResourceEvent::ResourceRenamed {
            resource_id: resource.id,
            name,
        };
        Ok(aggregate.advance(resource, event))
    }

    pub fn update_base_url(
        aggregate: &ResourceAggregate,
        base_url: impl Into<String>,
    ) -> Result<ResourceAggregate> {
        let current = aggregate.state();
        let http = current.require_http("update base url")?;
        let base_url = validate_base_url(base_url.into())?;

        let mut resource = current.clone();
        resource.config = ResourceConfig::Http(HttpResourceConfig {
            base_url: base_url.clone(),
            parameters: http.parameters.clone(),
        });
        resource.updated_at = Utc::now();
        let event = ResourceEvent::BaseUrlChanged {
            resource_id: resource.id,
            base_url,
        };
        Ok(aggregate.advance(resource, event))
    }

    /// Replaces the supplied parameter categories after checking them against
    /// every App bound to this resource.
    pub fn update_http_parameters(
        aggregate: &ResourceAggregate,
        changes: &ParameterChanges,
        bound_apps: &[BoundAppParameters],
    ) -> Result<ResourceAggregate> {
        let current = aggregate.state();
        let http = current.require_http("update http parameters")?;
        if changes.is_empty() {
            return Ok(aggregate.clone());
        }

        let parameters = http.parameters.apply(changes)?;
        ConflictValidator::check_app_to_resource_conflicts(bound_apps, changes)?;

        let mut resource = current.clone();
        resource.config = ResourceConfig::Http(HttpResourceConfig {
            base_url: http.base_url.clone(),
            parameters,
        });
        resource.updated_at = Utc::now();
        let event = ResourceEvent::HttpParametersChanged {
            resource_id: resource.id,
            categories: changes.categories(),
        };
        Ok(aggregate.advance(resource, event))
    }

    pub fn update_sql_connection(
        aggregate: &ResourceAggregate,
        config: SqlResourceConfig,
    ) -> Result<ResourceAggregate> {
        let current = aggregate.state();
        if current.sql().is_none() {
            return Err(DomainError::invalid_operation(format!(
                "cannot update sql connection on {} resource {}",
                current.kind().as_str(),
                current.id
            )));
        }
        config.validate()?;

        let mut resource = current.clone();
        resource.config = ResourceConfig::Sql(config);
        resource.updated_at = Utc::now();
        let event = ResourceEvent::SqlConnectionChanged {
            resource_id: resource.id,
        };
        Ok(aggregate.advance(resource, event))
    }
}

#[cfg(test)]
impl Resource {
    /// Http resource whose base URL was lost, which validated paths never produce.
    pub(crate) fn with_blank_base_url(mut self) -> Self {
        if let ResourceConfig::Http(http) = &mut self.config {
            http.base_url.clear();
        }
        self
    }
}

pub(crate) fn validate_name(name: String) -> Result<String> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::validation("name must not be empty"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "name exceeds {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(name)
}

fn validate_base_url(base_url: String) -> Result<String> {
    let base_url = base_url.trim().to_string();
    if base_url.is_empty() {
        return Err(DomainError::validation("base url must not be empty"));
    }
    if base_url.chars().count() > BASE_URL_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "base url exceeds {BASE_URL_MAX_CHARS} characters"
        )));
    }
    let parsed = url::Url::parse(&base_url)
        .map_err(|error| DomainError::validation(format!("invalid base url `{base_url}`: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DomainError::validation(format!(
            "base url `{base_url}` must use http or https"
        )));
    }
    Ok(base_url)
}
