//! Stratus Assert
//!
//! Matchers over synthesized [`Template`]s for integration tests. The
//! `have_resource` family checks that some resource of a type carries the
//! expected properties: [`have_resource`] compares listed properties for
//! equality, [`have_resource_like`] descends into nested objects and
//! accepts any superset. The `assert_` variants panic with the closest
//! candidates listed, which keeps test failures readable.
//!
//! ```rust,ignore
//! assert_has_resource(
//!     &template,
//!     "AWS::ECS::Service",
//!     &json!({ "DesiredCount": 1, "LaunchType": "FARGATE" }),
//! );
//! ```

use serde_json::Value;
use stratus_core::Template;

/// Whether some resource of `resource_type` carries every listed property
/// with exactly the given value.
#[must_use]
pub fn have_resource(template: &Template, resource_type: &str, properties: &Value) -> bool {
    template
        .resources_of_type(resource_type)
        .iter()
        .any(|(_, resource)| properties_match(properties, resource, Value::eq))
}

/// Whether some resource of `resource_type` carries every listed property,
/// comparing objects and arrays structurally: expected objects may name a
/// subset of the actual keys, arrays must match element by element.
#[must_use]
pub fn have_resource_like(template: &Template, resource_type: &str, properties: &Value) -> bool {
    template
        .resources_of_type(resource_type)
        .iter()
        .any(|(_, resource)| properties_match(properties, resource, like_match))
}

/// Number of resources of `resource_type` in the template
#[must_use]
pub fn resource_count_of_type(template: &Template, resource_type: &str) -> usize {
    template.resources_of_type(resource_type).len()
}

/// Panics unless [`have_resource`] holds.
///
/// # Panics
///
/// Panics with the expected properties and every candidate resource of the
/// type when no resource matches.
pub fn assert_has_resource(template: &Template, resource_type: &str, properties: &Value) {
    if !have_resource(template, resource_type, properties) {
        panic_with_candidates(template, resource_type, properties);
    }
}

/// Panics unless [`have_resource_like`] holds.
///
/// # Panics
///
/// Panics with the expected properties and every candidate resource of the
/// type when no resource matches.
pub fn assert_has_resource_like(template: &Template, resource_type: &str, properties: &Value) {
    if !have_resource_like(template, resource_type, properties) {
        panic_with_candidates(template, resource_type, properties);
    }
}

fn properties_match(
    expected: &Value,
    resource: &Value,
    compare: fn(&Value, &Value) -> bool,
) -> bool {
    let Some(expected) = expected.as_object() else {
        return false;
    };
    let actual = resource.get("Properties");
    expected.iter().all(|(key, value)| {
        actual
            .and_then(|properties| properties.get(key))
            .is_some_and(|found| compare(value, found))
    })
}

fn like_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => expected
            .iter()
            .all(|(key, value)| actual.get(key).is_some_and(|found| like_match(value, found))),
        (Value::Array(expected), Value::Array(actual)) => {
            expected.len() == actual.len()
                && expected
                    .iter()
                    .zip(actual)
                    .all(|(value, found)| like_match(value, found))
        }
        _ => expected == actual,
    }
}

fn panic_with_candidates(template: &Template, resource_type: &str, properties: &Value) -> ! {
    let candidates = template.resources_of_type(resource_type);
    let listing = if candidates.is_empty() {
        format!("the template contains no {resource_type} resources")
    } else {
        candidates
            .iter()
            .map(|(id, resource)| {
                format!(
                    "{id}:\n{}",
                    serde_json::to_string_pretty(resource).unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    panic!(
        "no {resource_type} resource matched\nexpected properties:\n{}\ncandidates:\n{listing}",
        serde_json::to_string_pretty(properties).unwrap_or_default()
    );
}
