//! Runs: one execution attempt of an App, and the status machine that tracks it.
//!
//! ```text
//! Pending ──► Running ──► Success
//!    │           ├──────► Failure
//!    │           └──────► InvalidConfiguration
//!    ├──────────────────► Failure
//!    └──────────────────► InvalidConfiguration
//! ```
//!
//! Terminal states accept nothing. The resolved request is only ever written by
//! composing from an App and its Resource.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::Aggregate;
use crate::app::App;
use crate::composer::{ExecutableHttpRequest, RequestComposer};
use crate::config::{ConfigError, RunConfig};
use crate::error::{DomainError, Result};
use crate::ids::{AppId, RunId};
use crate::input::InputValue;
use crate::resource::Resource;
use crate::substitution::TemplateSubstitutor;

pub type RunAggregate = Aggregate<Run, RunEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failure,
    InvalidConfiguration,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::InvalidConfiguration => "invalid_configuration",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Success | Self::Failure | Self::InvalidConfiguration
        )
    }

    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        match self {
            Self::Pending => matches!(
                to,
                Self::Running | Self::Failure | Self::InvalidConfiguration
            ),
            Self::Running => matches!(
                to,
                Self::Success | Self::Failure | Self::InvalidConfiguration
            ),
            Self::Success | Self::Failure | Self::InvalidConfiguration => false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    id: RunId,
    app_id: AppId,
    status: RunStatus,
    input_values: Vec<InputValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    executable_request: Option<ExecutableHttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl Run {
    #[must_use]
    pub fn id(&self) -> RunId {
        self.id
    }

    #[must_use]
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    #[must_use]
    pub fn input_values(&self) -> &[InputValue] {
        &self.input_values
    }

    #[must_use]
    pub fn input_value(&self, title: &str) -> Option<&str> {
        self.input_values
            .iter()
            .find(|value| value.title == title)
            .map(|value| value.value.as_str())
    }

    #[must_use]
    pub fn executable_request(&self) -> Option<&ExecutableHttpRequest> {
        self.executable_request.as_ref()
    }

    #[must_use]
    pub fn response(&self) -> Option<&str> {
        self.response.as_deref()
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Wall time between start and completion, once both are known.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        Some(self.completed_at? - self.started_at?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunCreated {
        run_id: RunId,
        app_id: AppId,
        input_titles: Vec<String>,
    },
    StatusChanged {
        run_id: RunId,
        from: RunStatus,
        to: RunStatus,
        at: DateTime<Utc>,
    },
}

/// Result reported by whoever performed the external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success { response: String },
    Failure { error: String },
}

#[derive(Debug, Clone, Default)]
pub struct RunLifecycle {
    config: RunConfig,
}

impl RunLifecycle {
    #[must_use]
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Ok(Self::new(RunConfig::from_env()?))
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Validates `input_values` against the App's input schema and opens a
    /// `Pending` run.
    pub fn create(&self, app: &App, input_values: Vec<InputValue>) -> Result<RunAggregate> {
        self.validate_input_values(app, &input_values)?;

        let run = Run {
            id: RunId::new(),
            app_id: app.id(),
            status: RunStatus::Pending,
            input_values,
            executable_request: None,
            response: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let event = RunEvent::RunCreated {
            run_id: run.id,
            app_id: run.app_id,
            input_titles: run
                .input_values
                .iter()
                .map(|value| value.title.clone())
                .collect(),
        };
        info!(run_id = %run.id, app_id = %run.app_id, "run created");
        Ok(Aggregate::create(run, vec![event]))
    }

    fn validate_input_values(&self, app: &App, input_values: &[InputValue]) -> Result<()> {
        let mut provided = BTreeSet::new();
        let duplicates = input_values
            .iter()
            .map(|value| value.title.as_str())
            .filter(|title| !provided.insert(*title))
            .collect::<BTreeSet<_>>();
        if !duplicates.is_empty() {
            return Err(DomainError::validation(format!(
                "input values provided more than once: {}",
                join(duplicates)
            )));
        }

        let missing = app
            .inputs()
            .iter()
            .filter(|input| input.is_required() && !provided.contains(input.title()))
            .map(|input| input.title())
            .collect::<Vec<_>>();
        let unexpected = input_values
            .iter()
            .map(|value| value.title.as_str())
            .filter(|title| app.input(title).is_none())
            .collect::<Vec<_>>();

        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing required inputs: {}", join(missing)));
        }
        if !unexpected.is_empty() {
            problems.push(format!(
                "inputs not defined by app: {}",
                join(unexpected)
            ));
        }
        if !problems.is_empty() {
            return Err(DomainError::validation(problems.join("; ")));
        }

        let oversized = input_values
            .iter()
            .filter(|value| value.value.chars().count() > self.config.max_input_value_chars)
            .map(|value| value.title.as_str())
            .collect::<Vec<_>>();
        if !oversized.is_empty() {
            return Err(DomainError::validation(format!(
                "input values exceed {} characters: {}",
                self.config.max_input_value_chars,
                join(oversized)
            )));
        }

        if self.config.validate_input_types {
            let mismatches = input_values
                .iter()
                .filter_map(|value| {
                    let input = app.input(&value.title)?;
                    input
                        .input_type()
                        .check_value(&value.value)
                        .err()
                        .map(|reason| format!("input `{}` {reason}", value.title))
                })
                .collect::<Vec<_>>();
            if !mismatches.is_empty() {
                return Err(DomainError::validation(mismatches.join("; ")));
            }
        }

        Ok(())
    }

    /// Composes the App's request against its Resource, substitutes the run's
    /// input values and stores the result. No status change and no event.
    pub fn compose_executable_request_from_app_and_resource(
        run: &RunAggregate,
        app: &App,
        resource: &Resource,
    ) -> Result<RunAggregate> {
        let current = run.state();
        if current.status.is_terminal() {
            return Err(DomainError::invalid_operation(format!(
                "run {} is already {}",
                current.id, current.status
            )));
        }
        if current.app_id != app.id() {
            return Err(DomainError::invalid_operation(format!(
                "run {} belongs to app {}, not {}",
                current.id,
                current.app_id,
                app.id()
            )));
        }

        let composed = RequestComposer::compose(resource, app)?;
        let resolved = TemplateSubstitutor::substitute(&composed, &current.input_values);

        let mut next = current.clone();
        next.executable_request = Some(resolved);
        Ok(run.with_state(next))
    }

    /// Composition step that resolves configuration problems into
    /// `InvalidConfiguration` instead of returning them.
    pub fn prepare(run: &RunAggregate, app: &App, resource: &Resource) -> Result<RunAggregate> {
        match Self::compose_executable_request_from_app_and_resource(run, app, resource) {
            Ok(prepared) => Ok(prepared),
            Err(error) if run.state().status.is_terminal() => Err(error),
            Err(error) => Self::mark_as_invalid_configuration(run, error.to_string()),
        }
    }

    pub fn mark_as_running(run: &RunAggregate) -> Result<RunAggregate> {
        Self::transition(run, RunStatus::Running, |next, now| {
            next.started_at = Some(now);
        })
    }

    pub fn mark_as_success(run: &RunAggregate, response: impl Into<String>) -> Result<RunAggregate> {
        let response = response.into();
        Self::transition(run, RunStatus::Success, |next, now| {
            next.completed_at = Some(now);
            next.response = Some(response);
        })
    }

    pub fn mark_as_failure(run: &RunAggregate, error_message: impl Into<String>) -> Result<RunAggregate> {
        let error_message = error_message.into();
        Self::transition(run, RunStatus::Failure, |next, now| {
            next.completed_at = Some(now);
            next.error_message = Some(error_message);
        })
    }

    pub fn mark_as_invalid_configuration(
        run: &RunAggregate,
        error_message: impl Into<String>,
    ) -> Result<RunAggregate> {
        let error_message = error_message.into();
        let resolved = Self::transition(run, RunStatus::InvalidConfiguration, |next, now| {
            next.completed_at = Some(now);
            next.error_message = Some(error_message);
        })?;
        warn!(
            run_id = %resolved.state().id,
            error = resolved.state().error_message().unwrap_or_default(),
            "run configuration is invalid"
        );
        Ok(resolved)
    }

    pub fn record_outcome(run: &RunAggregate, outcome: ExecutionOutcome) -> Result<RunAggregate> {
        match outcome {
            ExecutionOutcome::Success { response } => Self::mark_as_success(run, response),
            ExecutionOutcome::Failure { error } => Self::mark_as_failure(run, error),
        }
    }

    fn transition(
        run: &RunAggregate,
        to: RunStatus,
        update: impl FnOnce(&mut Run, DateTime<Utc>),
    ) -> Result<RunAggregate> {
        let current = run.state();
        let from = current.status;
        ensure_transition_allowed(from, to)?;

        let now = Utc::now();
        let mut next = current.clone();
        next.status = to;
        update(&mut next, now);
        let event = RunEvent::StatusChanged {
            run_id: next.id,
            from,
            to,
            at: now,
        };
        info!(run_id = %next.id, from = from.as_str(), to = to.as_str(), "run status changed");
        Ok(run.advance(next, event))
    }
}

fn ensure_transition_allowed(from: RunStatus, to: RunStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(DomainError::invalid_operation(format!(
            "invalid run transition: {from} -> {to}"
        )))
    }
}

fn join<'a>(titles: impl IntoIterator<Item = &'a str>) -> String {
    titles.into_iter().collect::<Vec<_>>().join(", ")
}
