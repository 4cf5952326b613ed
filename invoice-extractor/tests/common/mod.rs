use invoice_extractor::config::{ExtractorConfig, UploadConfig};
use invoice_extractor::services::TextExtractor;
use invoice_extractor::startup::Application;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use service_core::config::{Config as CoreConfig, LlmConfig};
use service_core::llm::CompletionClient;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub const PDF_MIME: &str = "application/pdf";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub upload_dir: String,
    pub client: reqwest::Client,
}

pub fn test_config(upload_dir: &str, max_bytes: usize) -> ExtractorConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("AZURE_OPENAI_ENDPOINT", "http://127.0.0.1:9"),
        ("AZURE_OPENAI_API_KEY", "test-key"),
    ]);
    let llm = LlmConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("Failed to build LLM configuration");

    ExtractorConfig {
        common: CoreConfig { port: 0 },
        llm,
        upload: UploadConfig {
            dir: upload_dir.to_string(),
            max_bytes,
        },
    }
}

impl TestApp {
    pub async fn spawn(
        client: Arc<dyn CompletionClient>,
        text_extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self::spawn_with_limit(client, text_extractor, 20 * 1024 * 1024).await
    }

    pub async fn spawn_with_limit(
        client: Arc<dyn CompletionClient>,
        text_extractor: Arc<dyn TextExtractor>,
        max_bytes: usize,
    ) -> Self {
        let upload_dir = format!("target/test-uploads-{}", Uuid::new_v4());
        let config = test_config(&upload_dir, max_bytes);

        let app = Application::build_with(config, client, text_extractor)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            port,
            upload_dir,
            client: reqwest::Client::new(),
        }
    }

    pub async fn post_file(&self, file_name: &str, data: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)
            .expect("Invalid mime type");
        let form = reqwest::multipart::Form::new().part("file", part);
        self.post_form(form).await
    }

    pub async fn post_form(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/extract", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn archived_files(&self) -> usize {
        let mut count = 0;
        if let Ok(mut entries) = tokio::fs::read_dir(&self.upload_dir).await {
            while let Ok(Some(_)) = entries.next_entry().await {
                count += 1;
            }
        }
        count
    }

    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.upload_dir).await;
    }
}

/// Single-page PDF with one line of Courier text.
pub fn sample_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("Failed to encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("Failed to write PDF");
    buf
}
