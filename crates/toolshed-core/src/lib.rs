//! Template composition and run execution engine for Resources, Apps and Runs.
//!
//! Resources hold reusable HTTP (or SQL) connection templates; Apps add their
//! own parameters on top of exactly one Resource; Runs execute an App with
//! concrete input values. Every entity lives in an [`Aggregate`] so state
//! changes come with the events that explain them.

#![forbid(unsafe_code)]

pub mod aggregate;
pub mod app;
pub mod composer;
pub mod config;
pub mod conflict;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod input;
pub mod key_value;
pub mod parameters;
pub mod resource;
pub mod run;
pub mod substitution;

pub use aggregate::Aggregate;
pub use app::{App, AppAggregate, AppEvent, HttpMethod, NewApp, UrlPath};
pub use composer::{ExecutableHttpRequest, RequestComposer, RequestField, join_url_path};
pub use config::{ConfigError, RunConfig};
pub use conflict::{BoundAppParameters, CategoryConflict, ConflictValidator};
pub use dispatch::{RequestDispatcher, execute_run};
pub use error::{DomainError, DomainErrorKind, Result};
pub use ids::{AppId, FolderId, ResourceId, RunId};
pub use input::{Input, InputType, InputValue};
pub use key_value::KeyValuePair;
pub use parameters::{ParameterCategory, ParameterChanges, ParameterSet};
pub use resource::{
    HttpResourceConfig, Resource, ResourceAggregate, ResourceConfig, ResourceEvent, ResourceKind,
    SqlResourceConfig,
};
pub use run::{ExecutionOutcome, Run, RunAggregate, RunEvent, RunLifecycle, RunStatus};
pub use substitution::TemplateSubstitutor;
