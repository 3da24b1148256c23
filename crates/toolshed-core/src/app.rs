//! Apps: parameterized actions bound to exactly one Resource.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::Aggregate;
use crate::conflict::{BoundAppParameters, ConflictValidator};
use crate::error::{DomainError, Result};
use crate::ids::{AppId, FolderId, ResourceId};
use crate::input::{Input, ensure_unique_titles};
use crate::parameters::{ParameterCategory, ParameterChanges, ParameterSet};
use crate::resource::validate_name;

pub const URL_PATH_MAX_CHARS: usize = 1000;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;

pub type AppAggregate = Aggregate<App, AppEvent>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(DomainError::validation(format!(
                "unsupported http method `{value}`"
            ))),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path appended to the Resource base URL. May carry `{title}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UrlPath(String);

impl TryFrom<String> for UrlPath {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UrlPath> for String {
    fn from(value: UrlPath) -> Self {
        value.0
    }
}

impl UrlPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into().trim().to_string();
        if path.is_empty() {
            return Err(DomainError::validation("url path must not be empty"));
        }
        if path.chars().count() > URL_PATH_MAX_CHARS {
            return Err(DomainError::validation(format!(
                "url path exceeds {URL_PATH_MAX_CHARS} characters"
            )));
        }
        if path.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!(
                "url path `{path}` must not contain whitespace"
            )));
        }
        Ok(Self(path))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Everything needed to create an App besides the Resource snapshot.
#[derive(Debug, Clone, Default)]
pub struct NewApp {
    pub name: String,
    pub description: Option<String>,
    pub folder_id: FolderId,
    pub resource_id: ResourceId,
    pub method: HttpMethod,
    pub inputs: Vec<Input>,
    pub url_path: Option<String>,
    pub parameters: ParameterSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    id: AppId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    folder_id: FolderId,
    resource_id: ResourceId,
    method: HttpMethod,
    inputs: Vec<Input>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url_path: Option<UrlPath>,
    parameters: ParameterSet,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    AppCreated {
        app_id: AppId,
        resource_id: ResourceId,
        folder_id: FolderId,
        name: String,
    },
    AppRenamed {
        app_id: AppId,
        name: String,
    },
    InputsChanged {
        app_id: AppId,
        titles: Vec<String>,
    },
    UrlPathChanged {
        app_id: AppId,
        url_path: Option<UrlPath>,
    },
    MethodChanged {
        app_id: AppId,
        method: HttpMethod,
    },
    MovedToFolder {
        app_id: AppId,
        folder_id: FolderId,
    },
    ParametersChanged {
        app_id: AppId,
        categories: Vec<ParameterCategory>,
    },
}

impl App {
    /// Validates `new` and checks its parameters against the bound Resource's.
    pub fn create(new: NewApp, resource_parameters: &ParameterSet) -> Result<AppAggregate> {
        let name = validate_name(new.name)?;
        let description = validate_description(new.description)?;
        ensure_unique_titles(&new.inputs)?;
        let url_path = new.url_path.map(UrlPath::new).transpose()?;
        let parameters = new.parameters;
        ConflictValidator::check_resource_to_app_conflicts(
            resource_parameters,
            &ParameterChanges::replace_all(&parameters),
        )?;

        let now = Utc::now();
        let app = Self {
            id: AppId::new(),
            name,
            description,
            folder_id: new.folder_id,
            resource_id: new.resource_id,
            method: new.method,
            inputs: new.inputs,
            url_path,
            parameters,
            created_at: now,
            updated_at: now,
        };
        let event = AppEvent::AppCreated {
            app_id: app.id,
            resource_id: app.resource_id,
            folder_id: app.folder_id,
            name: app.name.clone(),
        };
        debug!(app_id = %app.id, resource_id = %app.resource_id, "app created");
        Ok(Aggregate::create(app, vec![event]))
    }

    #[must_use]
    pub fn id(&self) -> AppId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn folder_id(&self) -> FolderId {
        self.folder_id
    }

    #[must_use]
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    #[must_use]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    #[must_use]
    pub fn url_path(&self) -> Option<&UrlPath> {
        self.url_path.as_ref()
    }

    #[must_use]
    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
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
    pub fn input(&self, title: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.title() == title)
    }

    /// This App's parameters as its Resource sees them in a conflict snapshot.
    #[must_use]
    pub fn bound_parameters(&self) -> BoundAppParameters {
        BoundAppParameters {
            app_id: self.id,
            app_name: self.name.clone(),
            parameters: self.parameters.clone(),
        }
    }

    pub fn rename(aggregate: &AppAggregate, name: impl Into<String>) -> Result<AppAggregate> {
        let name = validate_name(name.into())?;
        let mut app = aggregate.state().clone();
        app.name = name.clone();
        app.updated_at = Utc::now();
        let event = AppEvent::AppRenamed {
            app_id: app.id,
            name,
        };
        Ok(aggregate.advance(app, event))
    }

    pub fn update_inputs(aggregate: &AppAggregate, inputs: Vec<Input>) -> Result<AppAggregate> {
        ensure_unique_titles(&inputs)?;
        let mut app = aggregate.state().clone();
        let titles = inputs
            .iter()
            .map(|input| input.title().to_string())
            .collect();
        app.inputs = inputs;
        app.updated_at = Utc::now();
        let event = AppEvent::InputsChanged {
            app_id: app.id,
            titles,
        };
        Ok(aggregate.advance(app, event))
    }

    /// `None` clears the path so requests hit the bare base URL.
    pub fn update_url_path(aggregate: &AppAggregate, url_path: Option<String>) -> Result<AppAggregate> {
        let url_path = url_path.map(UrlPath::new).transpose()?;
        let mut app = aggregate.state().clone();
        app.url_path = url_path.clone();
        app.updated_at = Utc::now();
        let event = AppEvent::UrlPathChanged {
            app_id: app.id,
            url_path,
        };
        Ok(aggregate.advance(app, event))
    }

    #[must_use]
    pub fn update_method(aggregate: &AppAggregate, method: HttpMethod) -> AppAggregate {
        let mut app = aggregate.state().clone();
        app.method = method;
        app.updated_at = Utc::now();
        let event = AppEvent::MethodChanged {
            app_id: app.id,
            method,
        };
        aggregate.advance(app, event)
    }

    #[must_use]
    pub fn move_to_folder(aggregate: &AppAggregate, folder_id: FolderId) -> AppAggregate {
        let mut app = aggregate.state().clone();
        app.folder_id = folder_id;
        app.updated_at = Utc::now();
        let event = AppEvent::MovedToFolder {
            app_id: app.id,
            folder_id,
        };
        aggregate.advance(app, event)
    }

    /// Replaces the supplied categories after checking them against the Resource.
    pub fn update_parameters(
        aggregate: &AppAggregate,
        changes: &ParameterChanges,
        resource_parameters: &ParameterSet,
    ) -> Result<AppAggregate> {
        if changes.is_empty() {
            return Ok(aggregate.clone());
        }
        let current = aggregate.state();
        let parameters = current.parameters.apply(changes)?;
        ConflictValidator::check_resource_to_app_conflicts(resource_parameters, changes)?;

        let mut app = current.clone();
        app.parameters = parameters;
        app.updated_at = Utc::now();
        let event = AppEvent::ParametersChanged {
            app_id: app.id,
            categories: changes.categories(),
        };
        Ok(aggregate.advance(app, event))
    }
}

fn validate_description(description: Option<String>) -> Result<Option<String>> {
    let Some(description) = description
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    else {
        return Ok(None);
    };
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "description exceeds {DESCRIPTION_MAX_CHARS} characters"
        )));
    }
    Ok(Some(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputType;
    use crate::key_value::pairs;

    fn new_app(parameters: ParameterSet) -> NewApp {
        NewApp {
            name: "Lookup user".to_string(),
            resource_id: ResourceId::new(),
            url_path: Some("/users/{id}".to_string()),
            parameters,
            ..NewApp::default()
        }
    }

    #[test]
    fn create_checks_resource_conflicts() -> Result<()> {
        let resource = ParameterSet::new(pairs([("token", "abc")])?, vec![], vec![])?;
        let clashing = ParameterSet::new(pairs([("token", "xyz")])?, vec![], vec![])?;
        assert!(matches!(
            App::create(new_app(clashing), &resource),
            Err(DomainError::Conflict(_))
        ));

        let fine = ParameterSet::new(pairs([("page", "1")])?, pairs([("token", "h")])?, vec![])?;
        let aggregate = App::create(new_app(fine), &resource)?;
        assert_eq!(
            aggregate.state().url_path().map(UrlPath::as_str),
            Some("/users/{id}")
        );
        assert!(matches!(
            aggregate.uncommitted_events(),
            [AppEvent::AppCreated { .. }]
        ));
        Ok(())
    }

    #[test]
    fn duplicate_input_titles_are_rejected() -> Result<()> {
        let mut new = new_app(ParameterSet::default());
        new.inputs = vec![Input::text("id")?, Input::text("id")?];
        assert!(matches!(
            App::create(new, &ParameterSet::default()),
            Err(DomainError::Validation(_))
        ));
        Ok(())
    }

    #[test]
    fn update_parameters_rechecks_conflicts() -> Result<()> {
        let resource = ParameterSet::new(vec![], pairs([("authorization", "Bearer t")])?, vec![])?;
        let aggregate = App::create(new_app(ParameterSet::default()), &resource)?.mark_committed();

        let clashing = ParameterChanges::default().with_headers(pairs([("authorization", "x")])?);
        assert!(matches!(
            App::update_parameters(&aggregate, &clashing, &resource),
            Err(DomainError::Conflict(_))
        ));

        let fine = ParameterChanges::default().with_body(pairs([("name", "{name}")])?);
        let updated = App::update_parameters(&aggregate, &fine, &resource)?;
        assert_eq!(updated.state().parameters().body().len(), 1);
        assert!(ConflictValidator::is_disjoint(
            updated.state().parameters(),
            &resource
        ));
        assert_eq!(updated.uncommitted_events().len(), 1);
        Ok(())
    }

    #[test]
    fn mutations_append_events_in_order() -> Result<()> {
        let aggregate = App::create(new_app(ParameterSet::default()), &ParameterSet::default())?;
        let aggregate = App::rename(&aggregate, "Find user")?;
        let aggregate = App::update_inputs(
            &aggregate,
            vec![Input::required("id", InputType::Integer)?],
        )?;
        let aggregate = App::update_url_path(&aggregate, None)?;
        let aggregate = App::update_method(&aggregate, HttpMethod::Post);
        let folder = FolderId::new();
        let aggregate = App::move_to_folder(&aggregate, folder);

        let app = aggregate.state();
        assert_eq!(app.name(), "Find user");
        assert!(app.url_path().is_none());
        assert_eq!(app.method(), HttpMethod::Post);
        assert_eq!(app.folder_id(), folder);
        assert!(app.updated_at() >= app.created_at());
        assert!(app.input("id").is_some_and(Input::is_required));

        let kinds = aggregate
            .uncommitted_events()
            .iter()
            .map(|event| match event {
                AppEvent::AppCreated { .. } => "created",
                AppEvent::AppRenamed { .. } => "renamed",
                AppEvent::InputsChanged { .. } => "inputs",
                AppEvent::UrlPathChanged { .. } => "url_path",
                AppEvent::MethodChanged { .. } => "method",
                AppEvent::MovedToFolder { .. } => "folder",
                AppEvent::ParametersChanged { .. } => "parameters",
            })
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            ["created", "renamed", "inputs", "url_path", "method", "folder"]
        );
        Ok(())
    }

    #[test]
    fn url_path_rules() {
        assert!(UrlPath::new("  ").is_err());
        assert!(UrlPath::new("/a b").is_err());
        assert!(UrlPath::new("/a/{b}").is_ok());
    }

    #[test]
    fn decoding_validates_url_path_and_inputs() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert!(serde_json::from_str::<UrlPath>(r#""/a b""#).is_err());
        assert_eq!(serde_json::from_str::<UrlPath>(r#""/users/{id}""#)?.as_str(), "/users/{id}");

        let app = App::create(new_app(ParameterSet::default()), &ParameterSet::default())?;
        let mut json = serde_json::to_value(app.state())?;
        assert_eq!(serde_json::from_value::<App>(json.clone())?, *app.state());

        json["urlPath"] = serde_json::json!("/with space");
        assert!(serde_json::from_value::<App>(json.clone()).is_err());

        json["urlPath"] = serde_json::json!("/ok");
        json["inputs"] = serde_json::json!([{ "title": "{id}", "inputType": { "type": "text" } }]);
        assert!(serde_json::from_value::<App>(json).is_err());
        Ok(())
    }

    #[test]
    fn method_parse_is_case_insensitive() -> Result<()> {
        assert_eq!(HttpMethod::parse("patch")?, HttpMethod::Patch);
        assert!(HttpMethod::parse("TRACE").is_err());
        Ok(())
    }
}
