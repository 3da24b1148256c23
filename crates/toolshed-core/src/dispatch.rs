//! Boundary to the collaborator that performs the real HTTP call.

use async_trait::async_trait;
use tracing::debug;

use crate::app::App;
use crate::composer::ExecutableHttpRequest;
use crate::error::Result;
use crate::resource::Resource;
use crate::run::{ExecutionOutcome, RunAggregate, RunLifecycle, RunStatus};

/// Sends a resolved request and returns the response body or an error message.
#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn dispatch(&self, request: &ExecutableHttpRequest) -> std::result::Result<String, String>;
}

/// Drives a pending run to a terminal state.
///
/// Configuration problems end in `InvalidConfiguration` without calling the
/// dispatcher. Every intermediate transition is kept in the returned event list.
pub async fn execute_run(
    run: &RunAggregate,
    app: &App,
    resource: &Resource,
    dispatcher: &dyn RequestDispatcher,
) -> Result<RunAggregate> {
    let prepared = RunLifecycle::prepare(run, app, resource)?;
    if prepared.state().status() == RunStatus::InvalidConfiguration {
        return Ok(prepared);
    }

    let running = RunLifecycle::mark_as_running(&prepared)?;
    let Some(request) = running.state().executable_request() else {
        return RunLifecycle::mark_as_failure(&running, "run has no executable request");
    };

    debug!(
        run_id = %running.state().id(),
        method = request.method().as_str(),
        url = request.base_url(),
        "dispatching run request"
    );
    let outcome = match dispatcher.dispatch(request).await {
        Ok(response) => ExecutionOutcome::Success { response },
        Err(error) => ExecutionOutcome::Failure { error },
    };
    RunLifecycle::record_outcome(&running, outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::app::NewApp;
    use crate::error::DomainError;
    use crate::input::{Input, InputValue};
    use crate::parameters::ParameterSet;
    use crate::resource::SqlResourceConfig;
    use crate::run::RunEvent;

    struct Recording {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(reply: std::result::Result<String, String>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen
                .lock()
                .map(|seen| seen.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl RequestDispatcher for Recording {
        async fn dispatch(
            &self,
            request: &ExecutableHttpRequest,
        ) -> std::result::Result<String, String> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.base_url().to_string());
            }
            self.reply.clone()
        }
    }

    fn fixture() -> Result<(Resource, App)> {
        let resource = Resource::create_http(
            "Status API",
            "https://status.example.com",
            ParameterSet::default(),
        )?
        .state()
        .clone();
        let app = App::create(
            NewApp {
                name: "Check".to_string(),
                resource_id: resource.id(),
                inputs: vec![Input::text("service")?],
                url_path: Some("/services/{service}".to_string()),
                ..NewApp::default()
            },
            &resource.parameters(),
        )?
        .state()
        .clone();
        Ok((resource, app))
    }

    #[tokio::test]
    async fn successful_dispatch_ends_in_success() -> Result<()> {
        let (resource, app) = fixture()?;
        let run = RunLifecycle::default().create(&app, vec![InputValue::new("service", "db")])?;
        let dispatcher = Recording::new(Ok("healthy".to_string()));

        let finished = execute_run(&run, &app, &resource, &dispatcher).await?;
        assert_eq!(finished.state().status(), RunStatus::Success);
        assert_eq!(finished.state().response(), Some("healthy"));
        assert_eq!(dispatcher.seen(), ["https://status.example.com/services/db"]);
        assert_eq!(finished.uncommitted_events().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn dispatch_error_ends_in_failure() -> Result<()> {
        let (resource, app) = fixture()?;
        let run = RunLifecycle::default().create(&app, vec![])?;
        let dispatcher = Recording::new(Err("503 Service Unavailable".to_string()));

        let finished = execute_run(&run, &app, &resource, &dispatcher).await?;
        assert_eq!(finished.state().status(), RunStatus::Failure);
        assert_eq!(
            finished.state().error_message(),
            Some("503 Service Unavailable")
        );
        Ok(())
    }

    #[tokio::test]
    async fn invalid_configuration_skips_dispatch() -> Result<()> {
        let (_, app) = fixture()?;
        let sql = Resource::create_sql(
            "db",
            SqlResourceConfig {
                host: "db".to_string(),
                port: 5432,
                database: "main".to_string(),
                username: "ro".to_string(),
                password: None,
            },
        )?
        .state()
        .clone();
        let run = RunLifecycle::default().create(&app, vec![])?;
        let dispatcher = Recording::new(Ok("unused".to_string()));

        let finished = execute_run(&run, &app, &sql, &dispatcher).await?;
        assert_eq!(finished.state().status(), RunStatus::InvalidConfiguration);
        assert!(dispatcher.seen().is_empty());
        assert!(matches!(
            finished.uncommitted_events().last(),
            Some(RunEvent::StatusChanged {
                to: RunStatus::InvalidConfiguration,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn finished_runs_are_not_executed_again() -> Result<()> {
        let (resource, app) = fixture()?;
        let run = RunLifecycle::default().create(&app, vec![])?;
        let dispatcher = Recording::new(Ok("ok".to_string()));
        let finished = execute_run(&run, &app, &resource, &dispatcher).await?;

        let again = execute_run(&finished, &app, &resource, &dispatcher).await;
        assert!(matches!(again, Err(DomainError::InvalidOperation(_))));
        assert_eq!(dispatcher.seen().len(), 1);
        Ok(())
    }
}
