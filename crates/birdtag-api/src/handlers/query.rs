//! `POST /query`: tag queries and tag mutations share one endpoint.
//!
//! The body decides the operation:
//! - `{"species": [..]}` is a presence (any-of) query
//! - `{"urls": [..], "operation": .., "tags": ["name,count", ..]}` mutates tags
//!   (`url` and numeric operation codes are accepted for older clients)
//! - any other object is a threshold query of `{tag: min_count}`

use crate::error::{BatchItemError, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use birdtag_core::models::tags::normalize_tag;
use birdtag_core::{AppError, TagDeltas, TagMap};
use birdtag_services::TagOperation;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum QueryRequest {
    ThresholdAnd(TagMap),
    PresenceOr(BTreeSet<String>),
    Mutate {
        addresses: Vec<String>,
        operation: TagOperation,
        deltas: TagDeltas,
    },
}

#[derive(Debug, Serialize)]
struct LinksResponse {
    links: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MutationResponse {
    updated: Vec<String>,
    errors: Vec<BatchItemError>,
}

/// Mutation verbs as sent by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MutationVerb {
    Add,
    Remove,
    Clear,
}

#[tracing::instrument(skip(state, body))]
pub async fn query(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<Value>,
) -> Result<axum::response::Response, HttpAppError> {
    match parse_query_request(body)? {
        QueryRequest::ThresholdAnd(filters) => {
            let records = state.query.threshold_and(&filters).await?;
            let links = state.query.signed_links(&records).await?;
            Ok(Json(LinksResponse { links }).into_response())
        }
        QueryRequest::PresenceOr(species) => {
            let records = state.query.presence_or(&species).await?;
            let links = state.query.signed_links(&records).await?;
            Ok(Json(LinksResponse { links }).into_response())
        }
        QueryRequest::Mutate {
            addresses,
            operation,
            deltas,
        } => {
            let mut report = state.mutator.apply_many(&addresses, operation, &deltas).await;

            // A single-address mutation surfaces its error directly
            if addresses.len() == 1 && report.updated.is_empty() {
                if let Some(failure) = report.errors.pop() {
                    return Err(failure.error.into());
                }
            }

            Ok(Json(MutationResponse {
                updated: report.updated,
                errors: report.errors.iter().map(BatchItemError::from).collect(),
            })
            .into_response())
        }
    }
}

pub(crate) fn parse_query_request(body: Value) -> Result<QueryRequest, AppError> {
    let Value::Object(object) = body else {
        return Err(AppError::InvalidQuery(
            "Query body must be a JSON object".to_string(),
        ));
    };

    if object.contains_key("urls") || object.contains_key("url") {
        return parse_mutation(object);
    }

    if let Some(species) = object.get("species") {
        return parse_species(species);
    }

    parse_thresholds(object)
}

fn parse_thresholds(object: Map<String, Value>) -> Result<QueryRequest, AppError> {
    let mut filters = TagMap::new();

    for (name, value) in object {
        let tag = normalize_tag(&name);
        if tag.is_empty() {
            return Err(AppError::InvalidQuery("Tag names must not be empty".to_string()));
        }
        let min_count = count_value(&value).ok_or_else(|| {
            AppError::InvalidQuery(format!(
                "Minimum count for '{}' must be a non-negative integer",
                name
            ))
        })?;
        let entry = filters.entry(tag).or_insert(0);
        *entry = (*entry).max(min_count);
    }

    if filters.is_empty() {
        return Err(AppError::InvalidQuery(
            "At least one tag filter is required".to_string(),
        ));
    }

    Ok(QueryRequest::ThresholdAnd(filters))
}

fn parse_species(value: &Value) -> Result<QueryRequest, AppError> {
    let names = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(normalize_tag).ok_or_else(|| {
                    AppError::InvalidQuery("Species must be a list of names".to_string())
                })
            })
            .collect::<Result<BTreeSet<String>, AppError>>()?,
        Value::String(name) => [normalize_tag(name)].into_iter().collect(),
        _ => {
            return Err(AppError::InvalidQuery(
                "Species must be a list of names".to_string(),
            ))
        }
    };

    let species: BTreeSet<String> = names.into_iter().filter(|n| !n.is_empty()).collect();
    if species.is_empty() {
        return Err(AppError::InvalidQuery(
            "At least one species is required".to_string(),
        ));
    }

    Ok(QueryRequest::PresenceOr(species))
}

fn parse_mutation(object: Map<String, Value>) -> Result<QueryRequest, AppError> {
    let addresses = match object.get("urls").or_else(|| object.get("url")) {
        Some(Value::String(address)) => vec![address.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    AppError::InvalidQuery("urls must be a list of addresses".to_string())
                })
            })
            .collect::<Result<Vec<String>, AppError>>()?,
        _ => {
            return Err(AppError::InvalidQuery(
                "urls must be a list of addresses".to_string(),
            ))
        }
    };
    if addresses.is_empty() {
        return Err(AppError::InvalidQuery(
            "At least one address is required".to_string(),
        ));
    }

    let verb = match object.get("operation") {
        Some(value) => parse_verb(value)?,
        None => {
            return Err(AppError::InvalidQuery(
                "operation is required (add, remove or clear)".to_string(),
            ))
        }
    };

    let tag_entries = match object.get("tags") {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(AppError::InvalidQuery(
                "tags must be a list of \"name,count\" strings".to_string(),
            ))
        }
    };

    let mut deltas = TagDeltas::new();
    for entry in tag_entries {
        let raw = entry.as_str().ok_or_else(|| {
            AppError::InvalidQuery("tags must be a list of \"name,count\" strings".to_string())
        })?;
        let (name, count) = parse_tag_entry(raw, verb)?;
        let signed = match verb {
            MutationVerb::Add | MutationVerb::Clear => count,
            MutationVerb::Remove => -count,
        };
        *deltas.entry(name).or_insert(0) += signed;
    }
    if deltas.is_empty() {
        return Err(AppError::InvalidQuery("At least one tag is required".to_string()));
    }

    let operation = match verb {
        MutationVerb::Add | MutationVerb::Remove => TagOperation::Merge,
        MutationVerb::Clear => TagOperation::Clear,
    };

    Ok(QueryRequest::Mutate {
        addresses,
        operation,
        deltas,
    })
}

fn parse_verb(value: &Value) -> Result<MutationVerb, AppError> {
    let verb = match value {
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(MutationVerb::Add),
            Some(0) => Some(MutationVerb::Remove),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "add" | "1" => Some(MutationVerb::Add),
            "remove" | "0" => Some(MutationVerb::Remove),
            "clear" => Some(MutationVerb::Clear),
            _ => None,
        },
        _ => None,
    };

    verb.ok_or_else(|| {
        AppError::InvalidQuery(format!(
            "Unknown operation {}; expected add, remove, clear, 1 or 0",
            value
        ))
    })
}

/// Parse one `"name,count"` entry. Clear accepts a bare name.
fn parse_tag_entry(raw: &str, verb: MutationVerb) -> Result<(String, i64), AppError> {
    let (name, count) = match raw.split_once(',') {
        Some((name, count)) => {
            let count = count.trim().parse::<u32>().map_err(|_| {
                AppError::InvalidQuery(format!(
                    "Invalid count in tag entry '{}'; expected \"name,count\"",
                    raw
                ))
            })?;
            (name, i64::from(count))
        }
        None if verb == MutationVerb::Clear => (raw, 0),
        None => {
            return Err(AppError::InvalidQuery(format!(
                "Tag entry '{}' must be \"name,count\"",
                raw
            )))
        }
    };

    let name = normalize_tag(name);
    if name.is_empty() {
        return Err(AppError::InvalidQuery(format!(
            "Tag entry '{}' has an empty name",
            raw
        )));
    }
    Ok((name, count))
}

fn count_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_threshold_query() {
        let request = parse_query_request(json!({"Crow": 2, "pigeon": "1"})).unwrap();
        let expected: TagMap = [("crow".to_string(), 2), ("pigeon".to_string(), 1)]
            .into_iter()
            .collect();
        assert_eq!(request, QueryRequest::ThresholdAnd(expected));
    }

    #[test]
    fn test_empty_threshold_query_is_invalid() {
        assert!(matches!(
            parse_query_request(json!({})),
            Err(AppError::InvalidQuery(_))
        ));
        assert!(matches!(
            parse_query_request(json!({"crow": -1})),
            Err(AppError::InvalidQuery(_))
        ));
        assert!(matches!(
            parse_query_request(json!(["crow"])),
            Err(AppError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_species_query() {
        let request = parse_query_request(json!({"species": ["Crow", "myna", " "]})).unwrap();
        let expected: BTreeSet<String> = ["crow".to_string(), "myna".to_string()].into_iter().collect();
        assert_eq!(request, QueryRequest::PresenceOr(expected));

        assert!(matches!(
            parse_query_request(json!({"species": []})),
            Err(AppError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_remove_becomes_negative_merge() {
        let request = parse_query_request(json!({
            "urls": ["s3://media/a.jpg"],
            "operation": "remove",
            "tags": ["crow,2", "Myna,1"]
        }))
        .unwrap();

        match request {
            QueryRequest::Mutate {
                addresses,
                operation,
                deltas,
            } => {
                assert_eq!(addresses, vec!["s3://media/a.jpg".to_string()]);
                assert_eq!(operation, TagOperation::Merge);
                assert_eq!(deltas.get("crow"), Some(&-2));
                assert_eq!(deltas.get("myna"), Some(&-1));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_url_and_numeric_operation() {
        let request = parse_query_request(json!({
            "url": "s3://media/a.jpg",
            "operation": 1,
            "tags": ["crow,1"]
        }))
        .unwrap();

        match request {
            QueryRequest::Mutate {
                addresses,
                operation,
                deltas,
            } => {
                assert_eq!(addresses.len(), 1);
                assert_eq!(operation, TagOperation::Merge);
                assert_eq!(deltas.get("crow"), Some(&1));
            }
            other => panic!("unexpected request: {other:?}"),
        }

        let request = parse_query_request(json!({
            "url": ["s3://media/a.jpg"],
            "operation": 0,
            "tags": ["crow,1"]
        }))
        .unwrap();
        assert!(matches!(request, QueryRequest::Mutate { ref deltas, .. } if deltas.get("crow") == Some(&-1)));
    }

    #[test]
    fn test_clear_accepts_bare_names() {
        let request = parse_query_request(json!({
            "urls": ["s3://media/a.jpg"],
            "operation": "clear",
            "tags": ["crow"]
        }))
        .unwrap();
        assert!(matches!(
            request,
            QueryRequest::Mutate { operation: TagOperation::Clear, ref deltas, .. } if deltas.contains_key("crow")
        ));
    }

    #[test]
    fn test_invalid_mutations() {
        let cases = [
            json!({"urls": [], "operation": "add", "tags": ["crow,1"]}),
            json!({"urls": ["s3://media/a.jpg"], "tags": ["crow,1"]}),
            json!({"urls": ["s3://media/a.jpg"], "operation": "replace", "tags": ["crow,1"]}),
            json!({"urls": ["s3://media/a.jpg"], "operation": "add", "tags": ["crow"]}),
            json!({"urls": ["s3://media/a.jpg"], "operation": "add", "tags": ["crow,many"]}),
            json!({"urls": ["s3://media/a.jpg"], "operation": "add", "tags": []}),
        ];
        for body in cases {
            assert!(
                matches!(parse_query_request(body.clone()), Err(AppError::InvalidQuery(_))),
                "expected InvalidQuery for {body}"
            );
        }
    }
}
