//! End-to-end pipeline scenarios: signed deployment through storage and
//! read-back, exercising the trust boundary the way an embedding
//! application would.

use std::sync::Arc;

use axum::http::StatusCode;
use scrim_core::signature::compute_signature;
use scrim_core::{
    ComponentId, ComponentStore, DeployConfig, DeployError, DeployPipeline,
    InMemoryComponentStore, RenderMode,
};

fn pipeline(allow_script: bool) -> (DeployPipeline, Arc<InMemoryComponentStore>) {
    let store = Arc::new(InMemoryComponentStore::new());
    let mut config = DeployConfig::with_secret("integration-secret");
    if allow_script {
        config = config.allow_webhook_script();
    }
    (DeployPipeline::new(config, store.clone()), store)
}

fn sign(pipeline: &DeployPipeline, body: &[u8]) -> String {
    let secret = pipeline
        .config()
        .shared_secret
        .as_ref()
        .expect("test pipeline has a secret");
    compute_signature(secret, body)
}

#[test]
fn signed_deploy_strips_scripts_and_stores_slot_mode() {
    let (pipeline, _store) = pipeline(false);
    let body = br#"{"title": "Hero", "html": "<b>Hi</b><script>x</script>", "mode": "slot"}"#;
    let sig = sign(&pipeline, body);

    let receipt = pipeline.deploy(body, Some(&sig)).unwrap();
    assert_eq!(receipt.title, "Hero");
    assert_eq!(receipt.mode, RenderMode::Slot);
    assert_eq!(
        receipt.shortcode,
        format!("[component id=\"{}\"]", receipt.id)
    );
    assert!(!receipt.js_allowed);

    let view = pipeline.component_view(receipt.id).unwrap();
    assert_eq!(view.html, "<b>Hi</b>");
    assert_eq!(view.mode, RenderMode::Slot);
    assert_eq!(view.slug, "hero");
}

#[test]
fn garbled_signature_is_rejected_with_no_writes() {
    let (pipeline, store) = pipeline(false);
    let body = br#"{"title": "Hero", "html": "<b>Hi</b>"}"#;

    let err = pipeline.deploy(body, Some("sha256=garbled")).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(err.category(), "authentication_error");
    assert_eq!(store.count(), 0);

    let err = pipeline.deploy(body, None).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(store.count(), 0);
}

#[test]
fn unconfigured_secret_accepts_no_deployments() {
    let store = Arc::new(InMemoryComponentStore::new());
    let pipeline = DeployPipeline::new(DeployConfig::default(), store.clone());
    let body = br#"{"title": "Hero"}"#;

    let err = pipeline.deploy(body, Some("sha256=anything")).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(store.count(), 0);
}

#[test]
fn unknown_mode_is_stored_as_shadow() {
    let (pipeline, _store) = pipeline(false);
    let body = br#"{"title": "Hero", "mode": "banana"}"#;
    let sig = sign(&pipeline, body);

    let receipt = pipeline.deploy(body, Some(&sig)).unwrap();
    assert_eq!(receipt.mode, RenderMode::Shadow);
    let view = pipeline.component_view(receipt.id).unwrap();
    assert_eq!(view.mode, RenderMode::Shadow);
}

#[test]
fn overwrite_redeployment_converges_on_one_component() {
    let (pipeline, store) = pipeline(false);
    let body = br#"{"title": "Hero", "html": "<p>v1</p>"}"#;
    let sig = sign(&pipeline, body);
    let first = pipeline.deploy(body, Some(&sig)).unwrap();

    let body2 = br#"{"title": "Hero", "html": "<p>v2</p>"}"#;
    let sig2 = sign(&pipeline, body2);
    let second = pipeline.deploy(body2, Some(&sig2)).unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.count(), 1);
    let view = pipeline.component_view(first.id).unwrap();
    assert_eq!(view.html, "<p>v2</p>");
}

#[test]
fn create_strategy_forces_duplication() {
    let (pipeline, store) = pipeline(false);
    let body = br#"{"title": "Hero", "update_strategy": "create"}"#;
    let sig = sign(&pipeline, body);

    let first = pipeline.deploy(body, Some(&sig)).unwrap();
    let second = pipeline.deploy(body, Some(&sig)).unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(store.count(), 2);
}

#[test]
fn explicit_component_id_survives_a_rename() {
    let (pipeline, store) = pipeline(false);
    let body = br#"{"title": "Hero"}"#;
    let sig = sign(&pipeline, body);
    let receipt = pipeline.deploy(body, Some(&sig)).unwrap();

    let body2 = format!(
        r#"{{"title": "Renamed Hero", "component_id": {}}}"#,
        receipt.id
    );
    let sig2 = sign(&pipeline, body2.as_bytes());
    let second = pipeline.deploy(body2.as_bytes(), Some(&sig2)).unwrap();

    assert_eq!(second.id, receipt.id);
    assert_eq!(store.count(), 1);
    let view = pipeline.component_view(receipt.id).unwrap();
    assert_eq!(view.title, "Renamed Hero");
    // Slug derived at creation is preserved across the rename.
    assert_eq!(view.slug, "hero");
}

#[test]
fn unprivileged_deploy_never_clears_a_stored_script() {
    // First, a privileged pipeline stores a script.
    let (privileged, store) = pipeline(true);
    let body = br#"{"title": "Hero", "js": "init();"}"#;
    let sig = sign(&privileged, body);
    let receipt = privileged.deploy(body, Some(&sig)).unwrap();
    assert!(receipt.js_allowed);
    assert_eq!(privileged.component_view(receipt.id).unwrap().js, "init();");

    // Then the flag is turned off and the same component is redeployed
    // with a hostile script payload.
    let unprivileged = DeployPipeline::new(DeployConfig::with_secret("integration-secret"), store);
    let body2 = br#"{"title": "Hero", "js": "evil();"}"#;
    let sig2 = sign(&unprivileged, body2);
    let second = unprivileged.deploy(body2, Some(&sig2)).unwrap();

    assert_eq!(second.id, receipt.id);
    assert!(!second.js_allowed);
    // The stored script is untouched: neither replaced nor cleared.
    assert_eq!(
        unprivileged.component_view(receipt.id).unwrap().js,
        "init();"
    );
}

#[test]
fn privileged_empty_script_clears_the_stored_value() {
    let (pipeline, _store) = pipeline(true);
    let body = br#"{"title": "Hero", "js": "init();"}"#;
    let sig = sign(&pipeline, body);
    let receipt = pipeline.deploy(body, Some(&sig)).unwrap();

    let body2 = br#"{"title": "Hero", "js": ""}"#;
    let sig2 = sign(&pipeline, body2);
    pipeline.deploy(body2, Some(&sig2)).unwrap();

    assert_eq!(pipeline.component_view(receipt.id).unwrap().js, "");
}

#[test]
fn oversized_body_is_rejected_even_when_correctly_signed() {
    let store = Arc::new(InMemoryComponentStore::new());
    let config = DeployConfig::with_secret("integration-secret").max_body_bytes(20_000);
    let pipeline = DeployPipeline::new(config, store.clone());

    let padding = "x".repeat(25_000);
    let body = format!(r#"{{"title": "Hero", "html": "{padding}"}}"#);
    let sig = sign(&pipeline, body.as_bytes());

    let err = pipeline.deploy(body.as_bytes(), Some(&sig)).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.count(), 0);
}

#[test]
fn malformed_and_titleless_bodies_are_validation_errors() {
    let (pipeline, store) = pipeline(false);

    let body = b"not json";
    let sig = sign(&pipeline, body);
    let err = pipeline.deploy(body, Some(&sig)).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let body = br#"{"html": "<b>x</b>"}"#;
    let sig = sign(&pipeline, body);
    let err = pipeline.deploy(body, Some(&sig)).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    assert_eq!(store.count(), 0);
}

#[test]
fn read_lookups_cover_missing_cases() {
    let (pipeline, _store) = pipeline(false);
    assert!(matches!(
        pipeline.component_view(ComponentId::new(999)),
        Err(DeployError::NotFound)
    ));
    let err = pipeline.component_view_by_slug("").unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(matches!(
        pipeline.component_view_by_slug("missing"),
        Err(DeployError::NotFound)
    ));
}

#[test]
fn slug_lookup_returns_the_stored_component() {
    let (pipeline, _store) = pipeline(false);
    let body = br#"{"title": "Hero Banner", "html": "<p>x</p>"}"#;
    let sig = sign(&pipeline, body);
    let receipt = pipeline.deploy(body, Some(&sig)).unwrap();

    let view = pipeline.component_view_by_slug("hero-banner").unwrap();
    assert_eq!(view.id, receipt.id);
    assert_eq!(view.html, "<p>x</p>");
}

#[test]
fn rendered_slot_component_round_trips_through_the_engine() {
    let (pipeline, store) = pipeline(false);
    let body = br#"{"title": "Hero", "html": "<b>Hi</b>", "css": ".a{}", "mode": "slot"}"#;
    let sig = sign(&pipeline, body);
    let receipt = pipeline.deploy(body, Some(&sig)).unwrap();

    let component = store.get(receipt.id).unwrap().unwrap();
    let rendered = scrim_core::render(&component);
    assert!(rendered.markup.contains("data-scrim-slot=\"1\""));
    assert!(rendered.markup.contains("<slot></slot>"));
    assert!(rendered.markup.contains("<b>Hi</b>"));
    assert!(
        rendered
            .assets
            .contains(&scrim_core::ClientAsset::RehydrationObserver)
    );
}
