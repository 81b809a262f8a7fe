//! Catalog and registry behavior across every adapter crate

use mockito::Matcher;
use scout::{
    build_registry, registry_from_config, AdapterContext, CredentialResolver, DefaultToolContext, Error, ScoutConfig,
    ToolKind,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

const CREDENTIAL_VARS: [&str; 3] = ["OLOSTEP_API_KEY", "FIRECRAWL_API_KEY", "SERPER_API_KEY"];

fn isolated_resolver() -> CredentialResolver {
    CredentialResolver::new()
        .with_env(HashMap::new())
        .with_search_depth(0)
}

fn context(config: ScoutConfig, resolver: CredentialResolver) -> AdapterContext {
    AdapterContext::new(config, resolver).unwrap()
}

#[test]
fn test_catalog_lists_every_tool_by_kind() {
    let registry = build_registry(&context(ScoutConfig::default(), isolated_resolver())).unwrap();

    assert_eq!(registry.len(), 23);
    assert_eq!(registry.by_kind(ToolKind::Search).len(), 7);
    assert_eq!(registry.by_kind(ToolKind::Scrape).len(), 5);
    assert_eq!(registry.by_kind(ToolKind::Data).len(), 11);

    let names = registry.names();
    let mut sorted = names.clone();
    sorted.sort_unstable();
    assert_eq!(names, sorted);
}

#[test]
fn test_validate_reports_missing_credentials() {
    let registry = build_registry(&context(ScoutConfig::default(), isolated_resolver())).unwrap();

    let problems = registry.validate();

    assert_eq!(problems.len(), 8);
    assert!(problems.values().all(|e| matches!(e, Error::MissingCredential { .. })));
    match &problems["serper_search"] {
        Error::MissingCredential { tool, var } => {
            assert_eq!(tool, "serper_search");
            assert_eq!(var, "SERPER_API_KEY");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!problems.contains_key("wikipedia_search"));
}

#[test]
fn test_validate_uses_config_credentials() {
    let config = ScoutConfig::from_toml_str(
        r#"
        [credentials]
        OLOSTEP_API_KEY = "o"
        FIRECRAWL_API_KEY = "f"
        SERPER_API_KEY = "s"
        "#,
    )
    .unwrap();

    let registry = registry_from_config(config).unwrap();

    assert!(registry.validate().is_empty());
}

#[test]
fn test_validate_passes_with_credentials() {
    let resolver = isolated_resolver().with_overrides(CREDENTIAL_VARS.map(|var| (var, "key")));
    let registry = build_registry(&context(ScoutConfig::default(), resolver)).unwrap();

    assert!(registry.validate().is_empty());
    assert_eq!(registry.validate_with(&isolated_resolver()).len(), 8);
}

#[test]
fn test_descriptors_expose_requirements() {
    let registry = build_registry(&context(ScoutConfig::default(), isolated_resolver())).unwrap();

    let descriptors = registry.descriptors();
    let crawl = descriptors
        .iter()
        .find(|d| d.name == "olostep_crawl_website")
        .unwrap();
    assert!(crawl.long_running);
    assert_eq!(crawl.required_env, vec!["OLOSTEP_API_KEY"]);
    assert_eq!(crawl.parameters["required"], json!(["start_url"]));

    let ddg = descriptors
        .iter()
        .find(|d| d.name == "duckduckgo_search")
        .unwrap();
    assert_eq!(ddg.dependencies.get("html"), Some(&true));

    let json = serde_json::to_value(&descriptors).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 23);
}

#[tokio::test]
async fn test_invoke_unknown_tool() {
    let registry = build_registry(&context(ScoutConfig::default(), isolated_resolver())).unwrap();

    let err = registry
        .invoke("nope", Arc::new(DefaultToolContext::generated()), json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ToolNotFound(ref name) if name == "nope"));
}

#[tokio::test]
async fn test_invoke_without_credential_is_configuration_error() {
    let registry = build_registry(&context(ScoutConfig::default(), isolated_resolver())).unwrap();

    let err = registry
        .invoke(
            "serper_search",
            Arc::new(DefaultToolContext::generated()),
            json!({ "query": "rust" }),
        )
        .await
        .unwrap_err();

    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_invoke_serper_with_configured_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/search")
        .match_header("x-api-key", "serper-key")
        .match_body(Matcher::PartialJson(json!({ "q": "rust", "num": 2 })))
        .with_status(200)
        .with_body(
            json!({
                "searchParameters": { "q": "rust", "engine": "google" },
                "organic": [
                    { "title": "Rust", "link": "https://www.rust-lang.org", "snippet": "Fast", "position": 1 },
                    { "title": "No link" },
                    { "title": "Book", "link": "https://doc.rust-lang.org/book", "position": 3 }
                ],
                "credits": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let config = ScoutConfig::from_toml_str(&format!(
        r#"
        [credentials]
        SERPER_API_KEY = "serper-key"

        [endpoints]
        serper = "{}"
        "#,
        server.url()
    ))
    .unwrap();
    let resolver = isolated_resolver().with_overrides(config.credentials.clone());
    let registry = build_registry(&context(config, resolver)).unwrap();

    let response = registry
        .invoke(
            "serper_search",
            Arc::new(DefaultToolContext::generated()),
            json!({ "query": "rust", "n_results": 2 }),
        )
        .await
        .unwrap();

    let organic = response.result["organic"].as_array().unwrap();
    assert_eq!(organic.len(), 1);
    assert_eq!(organic[0]["link"], "https://www.rust-lang.org");
    assert_eq!(response.result["searchParameters"]["engine"], "google");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invoke_rejects_bad_params() {
    let registry = build_registry(&context(ScoutConfig::default(), isolated_resolver())).unwrap();

    let err = registry
        .invoke(
            "yfinance_historical_data",
            Arc::new(DefaultToolContext::generated()),
            json!({ "ticker": 42 }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidParams(_)));
}
