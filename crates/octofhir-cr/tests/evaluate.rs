//! `$evaluate` through the library evaluation processor

mod common;

use common::*;
use octofhir_cr::cql::EvaluationSettings;
use octofhir_cr::diagnostics::{CR0003, CR0004, CR0400};
use octofhir_cr::fhir::bundle::collection;
use octofhir_cr::fhir::{DynRepository, FhirVersion};
use octofhir_cr::{EvaluateRequest, LibraryEvaluationProcessor};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};
use std::sync::Arc;

const SCREENING: &str = "http://example.org/fhir/Library/Screening";

fn repository(version: FhirVersion) -> DynRepository {
    Arc::new(MemoryRepository::new(version, [
        cql_library("Screening", "1.0.0", "library Screening version '1.0.0' define Subject define Adult"),
        cql_library("Screening", "2.0.0", "library Screening version '2.0.0' include Helpers define Subject"),
        cql_library("Helpers", "1.0.0", "library Helpers define Flag"),
        cql_library("Broken", "1.0.0", "library Broken using"),
        cql_library("Faulty", "1.0.0", "library Faulty define Fails"),
        patient("p1"),
    ]))
}

struct Fixture {
    processor: LibraryEvaluationProcessor,
    translator: Arc<HeaderTranslator>,
    engine: Arc<FakeEngine>,
}

fn fixture(version: FhirVersion) -> Fixture {
    let translator = Arc::new(HeaderTranslator::default());
    let engine = Arc::new(FakeEngine::default());
    let processor = LibraryEvaluationProcessor::new(repository(version), translator.clone(), engine.clone());
    Fixture {
        processor,
        translator,
        engine,
    }
}

fn issue_code(outcome: &Value) -> &str {
    outcome["issue"][0]["details"]["coding"][0]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn evaluates_latest_library_for_subject() {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(Some(SCREENING), None, None)
        .unwrap()
        .with_subject("Patient/p1");

    let result = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(
        result,
        json!({
            "resourceType": "Parameters",
            "parameter": [{ "name": "Subject", "resource": patient("p1") }]
        })
    );

    let calls = fixture.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].library, "Screening|2.0.0");
    assert_eq!(calls[0].parameters, vec!["%subject".to_string()]);
    assert_eq!(calls[0].subject.as_deref(), Some("Patient/p1"));
    // Screening 2.0.0 and its include
    assert_eq!(fixture.translator.translations(), 2);
}

#[tokio::test]
async fn pinned_version_and_requested_expressions() {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(Some(format!("{SCREENING}|1.0.0").as_str()), None, None)
        .unwrap()
        .with_expressions(["Adult"])
        .with_parameters(json!({
            "resourceType": "Parameters",
            "parameter": [{ "name": "Measurement Period", "valueString": "2024" }]
        }));

    let result = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(result["parameter"], json!([{ "name": "Adult", "valueBoolean": true }]));
    assert_eq!(fixture.engine.calls()[0].parameters, vec!["Measurement Period".to_string()]);
}

#[tokio::test]
async fn missing_library_is_reported_as_outcome() {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(Some("http://example.org/fhir/Library/Missing"), None, None).unwrap();

    let outcome = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(outcome["issue"][0]["code"], "not-found");
    assert_eq!(issue_code(&outcome), "CR0100");
    assert!(fixture.engine.calls().is_empty());
}

#[rstest]
#[case::translation_failure("broken-1-0-0", &[], "CR0300")]
#[case::undefined_expression("screening-1-0-0", &["Unknown"], "CR0303")]
#[case::engine_failure("faulty-1-0-0", &[], "CR0301")]
#[tokio::test]
async fn data_failures_become_outcomes(#[case] id: &str, #[case] expressions: &[&str], #[case] code: &str) {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(None, Some(id), None)
        .unwrap()
        .with_expressions(expressions.iter().copied());

    let outcome = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(outcome["resourceType"], "OperationOutcome");
    assert_eq!(issue_code(&outcome), code);
}

#[tokio::test]
async fn unknown_library_id_is_reported_as_outcome() {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(None, Some("nope"), None).unwrap();
    let outcome = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(issue_code(&outcome), "CR0100");
}

#[tokio::test]
async fn inline_library_loads_includes_from_bundle() {
    let fixture = fixture(FhirVersion::R4);
    let inline = cql_library("Inline", "0.1.0", "library Inline include Local define Answer");
    let data = collection([cql_library("Local", "1.0.0", "library Local define Value"), patient("p2")]);
    let request = EvaluateRequest::from_inputs(None, None, Some(inline))
        .unwrap()
        .with_subject("p2")
        .with_data(data)
        .with_server_data(false);

    let result = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(result["parameter"], json!([{ "name": "Answer", "valueBoolean": true }]));
    assert_eq!(fixture.engine.calls()[0].parameters, vec!["%subject".to_string()]);
}

#[tokio::test]
async fn libraries_are_cached_across_requests() {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(Some(format!("{SCREENING}|1.0.0").as_str()), None, None).unwrap();

    fixture.processor.evaluate(&request).await.unwrap();
    fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(fixture.translator.translations(), 1);
    assert_eq!(fixture.processor.cache().map(|c| c.len()), Some(1));

    let uncached = LibraryEvaluationProcessor::new(
        repository(FhirVersion::R4),
        fixture.translator.clone(),
        fixture.engine.clone(),
    )
    .with_settings(EvaluationSettings {
        cache_libraries: false,
        ..EvaluationSettings::default()
    });
    uncached.evaluate(&request).await.unwrap();
    uncached.evaluate(&request).await.unwrap();
    assert!(uncached.cache().is_none());
    assert_eq!(fixture.translator.translations(), 3);
}

#[tokio::test]
async fn unsupported_release_is_an_error() {
    let fixture = fixture(FhirVersion::Dstu2);
    let request = EvaluateRequest::from_inputs(Some(SCREENING), None, None).unwrap();
    let err = fixture.processor.evaluate(&request).await.unwrap_err();
    assert_eq!(err.code(), CR0400);
}

#[tokio::test]
async fn endpoints_must_match_repository_release() {
    let fixture = fixture(FhirVersion::R4);
    let request = EvaluateRequest::from_inputs(Some(SCREENING), None, None)
        .unwrap()
        .with_terminology_endpoint(repository(FhirVersion::R5));
    let err = fixture.processor.evaluate(&request).await.unwrap_err();
    assert_eq!(err.code(), CR0004);
}

#[tokio::test]
async fn content_endpoint_replaces_repository_libraries() {
    let fixture = fixture(FhirVersion::R4);
    let remote: DynRepository = Arc::new(MemoryRepository::new(FhirVersion::R4, [cql_library(
        "Screening",
        "9.0.0",
        "library Screening version '9.0.0' define Remote",
    )]));
    let request = EvaluateRequest::from_inputs(Some(SCREENING), None, None)
        .unwrap()
        .with_content_endpoint(remote);

    let result = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(result["parameter"][0]["name"], "Remote");
}

#[tokio::test]
async fn cached_libraries_do_not_leak_into_requests_with_own_sources() {
    let fixture = fixture(FhirVersion::R4);
    let local = EvaluateRequest::from_inputs(Some(SCREENING), None, None).unwrap();
    fixture.processor.evaluate(&local).await.unwrap();
    assert_eq!(fixture.processor.cache().map(|c| c.len()), Some(2));

    let remote: DynRepository = Arc::new(MemoryRepository::new(FhirVersion::R4, [cql_library(
        "Screening",
        "2.0.0",
        "library Screening version '2.0.0' define Remote",
    )]));
    let request = EvaluateRequest::from_inputs(Some(format!("{SCREENING}|2.0.0").as_str()), None, None)
        .unwrap()
        .with_content_endpoint(remote);
    let result = fixture.processor.evaluate(&request).await.unwrap();
    assert_eq!(result["parameter"][0]["name"], "Remote");

    let bundled = EvaluateRequest::from_inputs(Some(format!("{SCREENING}|2.0.0").as_str()), None, None)
        .unwrap()
        .with_data(collection([cql_library(
            "Screening",
            "2.0.0",
            "library Screening version '2.0.0' define Bundled",
        )]));
    let result = fixture.processor.evaluate(&bundled).await.unwrap();
    assert_eq!(result["parameter"][0]["name"], "Bundled");

    // the shared entries are untouched and still serve local requests
    assert_eq!(fixture.processor.cache().map(|c| c.len()), Some(2));
    fixture.processor.evaluate(&local).await.unwrap();
    assert_eq!(fixture.translator.translations(), 4);
}

#[test]
fn library_inputs_are_exclusive() {
    let err = EvaluateRequest::from_inputs(Some(SCREENING), None, Some(json!({ "resourceType": "Library" })))
        .err()
        .map(|e| e.code());
    assert_eq!(err, Some(CR0003));
}
