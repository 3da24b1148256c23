//! Merges a Resource template with an App's additions into one request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::app::{App, HttpMethod, UrlPath};
use crate::error::{DomainError, Result};
use crate::key_value::KeyValuePair;
use crate::parameters::ParameterCategory;
use crate::resource::Resource;

/// One resolved parameter, header or body field.
///
/// Not a [`KeyValuePair`]: after substitution a field may legitimately exceed
/// the authoring limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestField {
    pub key: String,
    pub value: String,
}

impl From<&KeyValuePair> for RequestField {
    fn from(pair: &KeyValuePair) -> Self {
        Self {
            key: pair.key().to_string(),
            value: pair.value().to_string(),
        }
    }
}

/// Fully described HTTP call, handed to an execution collaborator.
///
/// Only [`RequestComposer`] and the substitution step build these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableHttpRequest {
    method: HttpMethod,
    base_url: String,
    url_parameters: Vec<RequestField>,
    headers: Vec<RequestField>,
    body: Vec<RequestField>,
}

impl ExecutableHttpRequest {
    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn url_parameters(&self) -> &[RequestField] {
        &self.url_parameters
    }

    #[must_use]
    pub fn headers(&self) -> &[RequestField] {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[RequestField] {
        &self.body
    }

    #[must_use]
    pub fn category(&self, category: ParameterCategory) -> &[RequestField] {
        match category {
            ParameterCategory::UrlParameters => &self.url_parameters,
            ParameterCategory::Headers => &self.headers,
            ParameterCategory::Body => &self.body,
        }
    }

    /// Base URL with the URL parameters form-encoded into its query string.
    pub fn url(&self) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url).map_err(|error| {
            DomainError::validation(format!(
                "resolved url `{}` is invalid: {error}",
                self.base_url
            ))
        })?;
        if !self.url_parameters.is_empty() {
            let mut query = url.query_pairs_mut();
            for field in &self.url_parameters {
                query.append_pair(&field.key, &field.value);
            }
        }
        Ok(url)
    }

    /// Body fields as a flat JSON object, later keys winning.
    #[must_use]
    pub fn body_json(&self) -> Value {
        let object = self
            .body
            .iter()
            .map(|field| (field.key.clone(), Value::String(field.value.clone())))
            .collect::<Map<_, _>>();
        Value::Object(object)
    }

    /// Applies `rewrite` to the base URL and every key and value.
    pub(crate) fn map_strings(&self, rewrite: impl Fn(&str) -> String) -> Self {
        let fields = |fields: &[RequestField]| {
            fields
                .iter()
                .map(|field| RequestField {
                    key: rewrite(&field.key),
                    value: rewrite(&field.value),
                })
                .collect::<Vec<_>>()
        };
        Self {
            method: self.method,
            base_url: rewrite(&self.base_url),
            url_parameters: fields(&self.url_parameters),
            headers: fields(&self.headers),
            body: fields(&self.body),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RequestComposer;

impl RequestComposer {
    /// Resource fields first, then the App's, per category. Keys are disjoint by
    /// construction so plain concatenation is enough.
    pub fn compose(resource: &Resource, app: &App) -> Result<ExecutableHttpRequest> {
        let Some(http) = resource.http() else {
            return Err(DomainError::invalid_operation(format!(
                "cannot compose an http request from {} resource {}",
                resource.kind().as_str(),
                resource.id()
            )));
        };
        if app.resource_id() != resource.id() {
            return Err(DomainError::invalid_operation(format!(
                "app {} is bound to resource {}, not {}",
                app.id(),
                app.resource_id(),
                resource.id()
            )));
        }
        if http.base_url().trim().is_empty() {
            return Err(DomainError::invalid_operation(format!(
                "resource {} has no base url",
                resource.id()
            )));
        }

        let merge = |category: ParameterCategory| {
            http.parameters()
                .category(category)
                .iter()
                .chain(app.parameters().category(category))
                .map(RequestField::from)
                .collect::<Vec<_>>()
        };
        let request = ExecutableHttpRequest {
            method: app.method(),
            base_url: join_url_path(http.base_url(), app.url_path().map(UrlPath::as_str)),
            url_parameters: merge(ParameterCategory::UrlParameters),
            headers: merge(ParameterCategory::Headers),
            body: merge(ParameterCategory::Body),
        };
        debug!(
            app_id = %app.id(),
            resource_id = %resource.id(),
            method = request.method.as_str(),
            "composed http request"
        );
        Ok(request)
    }
}

/// Joins with exactly one `/` between base and path; no path leaves the base as is.
#[must_use]
pub fn join_url_path(base_url: &str, path: Option<&str>) -> String {
    let Some(path) = path.map(str::trim).filter(|path| !path.is_empty()) else {
        return base_url.to_string();
    };
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base_url.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
