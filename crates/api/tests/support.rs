//! Shared fixtures for the API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use casebridge_api::AppContext;
use casebridge_domain::{Application, ApplicationStatus, Attachment, Config};
use tempfile::TempDir;
use uuid::Uuid;

/// Build a context over a temporary database, pointing the registry at
/// `registry_base_url`.
pub fn test_context(registry_base_url: &str) -> (TempDir, Arc<AppContext>) {
    let temp_dir = TempDir::new().expect("temp dir created");

    let mut config = Config::default();
    config.database.path =
        temp_dir.path().join("test.db").to_string_lossy().into_owned();
    config.registry.base_url = registry_base_url.to_string();
    config.registry.token_url = format!("{registry_base_url}/oauth/token");
    config.registry.client_id = "client".to_string();
    config.registry.client_secret = "secret".to_string();
    config.registry.callback_base_url = "http://bridge.example.com".to_string();
    config.server.public_base_url = "http://bridge.example.com".to_string();
    config.server.download_token = "download-secret".to_string();
    config.payments.staged_payments_enabled = true;

    let ctx = Arc::new(AppContext::new(config).expect("context built"));
    (temp_dir, ctx)
}

pub fn handling_application() -> Application {
    Application {
        id: Uuid::new_v4(),
        application_number: format!("HEL-2024-{:06}", rand_suffix()),
        status: ApplicationStatus::Handling,
        case_id: None,
        case_guid: None,
        handler_username: Some("handler".to_string()),
        batch_id: None,
    }
}

pub fn attachment_with_hash(application_id: Uuid, file_name: &str, hash: &str) -> Attachment {
    Attachment {
        id: Uuid::new_v4(),
        application_id,
        file_name: file_name.to_string(),
        content_type: "application/pdf".to_string(),
        path: format!("/nonexistent/{file_name}"),
        content_hash: hash.to_string(),
        version_series_id: None,
    }
}

fn rand_suffix() -> u32 {
    // Uuid as a cheap source of uniqueness for application numbers.
    Uuid::new_v4().as_u128() as u32 % 1_000_000
}
