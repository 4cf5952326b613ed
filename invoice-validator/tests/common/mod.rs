use invoice_validator::config::{Adapter, ValidatorConfig};
use invoice_validator::startup::Application;
use service_core::config::{Config as CoreConfig, LlmConfig};
use service_core::llm::CompletionClient;
use std::collections::HashMap;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

pub fn test_config(extractor_url: &str, adapter: Adapter) -> ValidatorConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("AZURE_OPENAI_ENDPOINT", "http://127.0.0.1:9"),
        ("AZURE_OPENAI_API_KEY", "test-key"),
    ]);
    let llm = LlmConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("Failed to build LLM configuration");

    ValidatorConfig {
        common: CoreConfig { port: 0 },
        llm,
        extractor_url: extractor_url.to_string(),
        max_upload_bytes: 20 * 1024 * 1024,
        adapter,
    }
}

impl TestApp {
    pub async fn spawn(client: Arc<dyn CompletionClient>, extractor_url: &str) -> Self {
        Self::spawn_with(client, extractor_url, Adapter::Service).await
    }

    pub async fn spawn_with(
        client: Arc<dyn CompletionClient>,
        extractor_url: &str,
        adapter: Adapter,
    ) -> Self {
        let config = test_config(extractor_url, adapter);
        let app = Application::build_with(config, client)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            client: reqwest::Client::new(),
        }
    }

    pub async fn validate(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/api/validate_invoice", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn pdf_part(file_name: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(b"%PDF-1.5 test".to_vec())
        .file_name(file_name.to_string())
        .mime_str("application/pdf")
        .expect("Invalid mime type")
}

/// Form with a PDF named `invoice.pdf` and the given `data` text.
pub fn validation_form(data: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .part("file", pdf_part("invoice.pdf"))
        .text("data", data.to_string())
}
