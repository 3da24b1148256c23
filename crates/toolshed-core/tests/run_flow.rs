//! End-to-end run scenarios: creation, composition, substitution and status.

use quickcheck::{QuickCheck, TestResult};
use toolshed_core::{
    App, DomainError, Input, InputType, InputValue, NewApp, ParameterSet, RequestComposer,
    Resource, RunLifecycle, RunStatus, SqlResourceConfig, TemplateSubstitutor, key_value::pairs,
};

fn users_api() -> anyhow::Result<(Resource, App)> {
    let resource = Resource::create_http(
        "Users API",
        "https://api.example.com/v1",
        ParameterSet::new(vec![], pairs([("accept", "application/json")])?, vec![])?,
    )?
    .state()
    .clone();
    let app = App::create(
        NewApp {
            name: "Get user".to_string(),
            resource_id: resource.id(),
            inputs: vec![Input::required("id", InputType::Integer)?],
            url_path: Some("/users/{id}".to_string()),
            ..NewApp::default()
        },
        &resource.parameters(),
    )?
    .state()
    .clone();
    Ok((resource, app))
}

#[test]
fn url_path_placeholder_is_resolved_from_run_inputs() -> anyhow::Result<()> {
    let (resource, app) = users_api()?;
    let lifecycle = RunLifecycle::default();

    let run = lifecycle.create(&app, vec![InputValue::new("id", "42")])?;
    let run = RunLifecycle::compose_executable_request_from_app_and_resource(&run, &app, &resource)?;

    let Some(request) = run.state().executable_request() else {
        anyhow::bail!("run has no executable request");
    };
    assert_eq!(request.base_url(), "https://api.example.com/v1/users/42");
    assert_eq!(request.headers()[0].key, "accept");
    Ok(())
}

#[test]
fn missing_required_email_is_a_validation_error() -> anyhow::Result<()> {
    let (resource, _) = users_api()?;
    let app = App::create(
        NewApp {
            name: "Invite".to_string(),
            resource_id: resource.id(),
            inputs: vec![Input::required("email", InputType::Email)?],
            ..NewApp::default()
        },
        &resource.parameters(),
    )?;

    match RunLifecycle::default().create(app.state(), vec![]) {
        Err(DomainError::Validation(message)) => assert!(message.contains("email")),
        other => anyhow::bail!("expected validation error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn undeclared_input_is_a_validation_error() -> anyhow::Result<()> {
    let (resource, _) = users_api()?;
    let app = App::create(
        NewApp {
            name: "Echo".to_string(),
            resource_id: resource.id(),
            inputs: vec![Input::text("x")?],
            ..NewApp::default()
        },
        &resource.parameters(),
    )?;

    match RunLifecycle::default().create(app.state(), vec![InputValue::new("y", "1")]) {
        Err(DomainError::Validation(message)) => {
            assert!(message.contains("not defined"));
            assert!(message.contains('y'));
        }
        other => anyhow::bail!("expected validation error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn sql_resource_cannot_produce_a_request() -> anyhow::Result<()> {
    let sql = Resource::create_sql(
        "Warehouse",
        SqlResourceConfig {
            host: "warehouse.internal".to_string(),
            port: 5432,
            database: "analytics".to_string(),
            username: "reader".to_string(),
            password: Some("secret".to_string()),
        },
    )?
    .state()
    .clone();
    let app = App::create(
        NewApp {
            name: "Report".to_string(),
            resource_id: sql.id(),
            ..NewApp::default()
        },
        &sql.parameters(),
    )?
    .state()
    .clone();

    assert!(matches!(
        RequestComposer::compose(&sql, &app),
        Err(DomainError::InvalidOperation(_))
    ));

    let run = RunLifecycle::default().create(&app, vec![])?;
    let resolved = RunLifecycle::prepare(&run, &app, &sql)?;
    assert_eq!(resolved.state().status(), RunStatus::InvalidConfiguration);
    assert!(resolved.state().executable_request().is_none());
    Ok(())
}

#[test]
fn committed_events_are_not_replayed() -> anyhow::Result<()> {
    let (resource, app) = users_api()?;
    let run = RunLifecycle::default()
        .create(&app, vec![InputValue::new("id", "1")])?
        .mark_committed();
    let run = RunLifecycle::prepare(&run, &app, &resource)?;
    let run = RunLifecycle::mark_as_running(&run)?;
    assert_eq!(run.uncommitted_events().len(), 1);

    let run = RunLifecycle::mark_as_success(&run.mark_committed(), "{}")?;
    assert_eq!(run.uncommitted_events().len(), 1);
    assert_eq!(run.state().status(), RunStatus::Success);
    Ok(())
}

#[test]
fn composition_and_substitution_are_stable() {
    fn property(id: u32, extra_titles: Vec<String>) -> TestResult {
        let Ok((resource, app)) = users_api() else {
            return TestResult::error("fixture failed");
        };
        let (Ok(first), Ok(second)) = (
            RequestComposer::compose(&resource, &app),
            RequestComposer::compose(&resource, &app),
        ) else {
            return TestResult::error("composition failed");
        };
        if first != second {
            return TestResult::failed();
        }

        // Titles without braces never match anything in the composed request
        // except `{id}`, which is excluded here.
        let unrelated = extra_titles
            .into_iter()
            .filter(|title| title != "id")
            .map(|title| InputValue::new(title, id.to_string()))
            .collect::<Vec<_>>();
        let untouched = TemplateSubstitutor::substitute(&first, &unrelated);
        if untouched != first {
            return TestResult::failed();
        }

        let resolved = TemplateSubstitutor::substitute(&first, &[InputValue::new("id", id.to_string())]);
        TestResult::from_bool(
            resolved.base_url() == format!("https://api.example.com/v1/users/{id}"),
        )
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(property as fn(u32, Vec<String>) -> TestResult);
}
