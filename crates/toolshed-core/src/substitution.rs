//! `{title}` placeholder resolution over a composed request.
//!
//! Replacement is literal and single-pass per title, applied in the order the
//! values are given. A substituted value that itself contains a later title's
//! token gets replaced again when that later title is processed; this ordering
//! behaviour is kept as is.

use tracing::debug;

use crate::composer::ExecutableHttpRequest;
use crate::input::{InputValue, placeholder_for};

#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateSubstitutor;

impl TemplateSubstitutor {
    /// Replaces every `{title}` occurrence in the base URL and in every key and value.
    #[must_use]
    pub fn substitute(request: &ExecutableHttpRequest, values: &[InputValue]) -> ExecutableHttpRequest {
        let replacements = values
            .iter()
            .map(|value| (placeholder_for(&value.title), value.value.as_str()))
            .collect::<Vec<_>>();
        debug!(placeholders = replacements.len(), "substituting run input values");
        request.map_strings(|raw| substitute_str(raw, &replacements))
    }
}

fn substitute_str(raw: &str, replacements: &[(String, &str)]) -> String {
    replacements
        .iter()
        .fold(raw.to_string(), |resolved, (token, value)| {
            if resolved.contains(token.as_str()) {
                resolved.replace(token.as_str(), value)
            } else {
                resolved
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, NewApp};
    use crate::composer::RequestComposer;
    use crate::error::Result;
    use crate::key_value::pairs;
    use crate::parameters::ParameterSet;
    use crate::resource::Resource;

    fn composed(url_path: &str, parameters: ParameterSet) -> Result<ExecutableHttpRequest> {
        let resource = Resource::create_http(
            "API",
            "https://api.example.com/v1",
            ParameterSet::new(vec![], pairs([("authorization", "Bearer {token}")])?, vec![])?,
        )?
        .state()
        .clone();
        let app = App::create(
            NewApp {
                name: "Call".to_string(),
                resource_id: resource.id(),
                url_path: Some(url_path.to_string()),
                parameters,
                ..NewApp::default()
            },
            &resource.parameters(),
        )?
        .state()
        .clone();
        RequestComposer::compose(&resource, &app)
    }

    #[test]
    fn replaces_tokens_everywhere() -> Result<()> {
        let request = composed(
            "/users/{id}",
            ParameterSet::new(
                pairs([("{field}", "{id}")])?,
                vec![],
                pairs([("note", "user {id} ({id})")])?,
            )?,
        )?;
        let values = [
            InputValue::new("id", "42"),
            InputValue::new("field", "user_id"),
            InputValue::new("token", "s3cr3t"),
        ];

        let resolved = TemplateSubstitutor::substitute(&request, &values);
        assert_eq!(resolved.base_url(), "https://api.example.com/v1/users/42");
        assert_eq!(resolved.url_parameters()[0].key, "user_id");
        assert_eq!(resolved.url_parameters()[0].value, "42");
        assert_eq!(resolved.headers()[0].value, "Bearer s3cr3t");
        assert_eq!(resolved.body()[0].value, "user 42 (42)");
        Ok(())
    }

    #[test]
    fn no_matching_tokens_is_a_no_op() -> Result<()> {
        let request = composed("/status", ParameterSet::default())?;
        let resolved = TemplateSubstitutor::substitute(&request, &[InputValue::new("id", "1")]);
        assert_eq!(resolved, request);
        Ok(())
    }

    #[test]
    fn unknown_tokens_stay_verbatim() -> Result<()> {
        let request = composed("/users/{id}", ParameterSet::default())?;
        let resolved = TemplateSubstitutor::substitute(&request, &[]);
        assert_eq!(resolved.base_url(), "https://api.example.com/v1/users/{id}");
        assert_eq!(resolved.headers()[0].value, "Bearer {token}");
        Ok(())
    }

    #[test]
    fn substring_titles_resolve_independently() {
        let replacements = vec![
            ("{id}".to_string(), "1"),
            ("{userid}".to_string(), "2"),
        ];
        assert_eq!(substitute_str("/{userid}/{id}", &replacements), "/2/1");
    }

    #[test]
    fn replacement_order_is_observable() {
        // `a` injects `{b}`, which is then resolved because `b` comes later.
        let forward = vec![("{a}".to_string(), "{b}"), ("{b}".to_string(), "x")];
        assert_eq!(substitute_str("{a}", &forward), "x");

        let reverse = vec![("{b}".to_string(), "x"), ("{a}".to_string(), "{b}")];
        assert_eq!(substitute_str("{a}", &reverse), "{b}");
    }
}
