//! Shared fixtures for translation tests
//!
//! Includes a one-shot HTTP responder on a local port so model backends can
//! be exercised without any external service.

#![allow(dead_code)]

use querygate_catalog::{load_str, CatalogSnapshot, SourceFormat};
use querygate_core::{BackendConfig, BackendKind};
use querygate_translate::TranslationRequest;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const USAGE_SCHEMA: &str = r#"{
  "default_table": "ProductUsage",
  "tables": [
    {
      "name": "ProductUsage",
      "keywords": ["product usage"],
      "time_column": "Month",
      "measure_column": "RequestCount",
      "columns": [
        { "name": "Month", "type": "varchar(7)" },
        { "name": "Product", "type": "nvarchar(100)" },
        { "name": "RequestCount", "type": "bigint" }
      ]
    }
  ],
  "alias_groups": [
    {
      "dimension": "product",
      "values": { "JavaScript": ["js", "javascript", "node"] }
    }
  ],
  "dimensions": [
    { "dimension": "product", "table": "ProductUsage", "column": "Product" }
  ]
}"#;

pub fn snapshot() -> Arc<CatalogSnapshot> {
    let catalog = load_str(USAGE_SCHEMA, SourceFormat::Json).expect("fixture schema loads");
    Arc::new(CatalogSnapshot::new(catalog))
}

pub fn request(text: &str) -> TranslationRequest {
    TranslationRequest::new(text, snapshot())
}

pub fn backend(kind: BackendKind, endpoint: &str) -> BackendConfig {
    BackendConfig {
        name: format!("{:?}", kind).to_lowercase(),
        kind,
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        api_key_env: None,
        timeout_ms: 2_000,
        min_confidence: 0.7,
        enabled: true,
    }
}

/// Port with nothing listening on it
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Read one HTTP/1.1 request: headers plus `Content-Length` bytes of body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = socket.read(&mut chunk).await.unwrap();
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

/// Serve one request with `status` and a JSON `body`; the handle yields the
/// raw request that was received
pub async fn respond_once(status: u16, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let received = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        received
    });

    (endpoint, handle)
}

/// Accept connections and never answer
pub async fn silent_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    endpoint
}
