//! Integration tests separating service verdicts from transport failures.

use std::sync::{Arc, Mutex};

use tamper_scope_analysis_contract::ServiceReply;
use tamper_scope_core::MediaType;
use tamper_scope_upload::{
    AnalysisClient, AnalysisTransport, ImageUpload, RawReply, TransportError,
};
use url::Url;

#[derive(Debug)]
struct CannedTransport {
    reply: Result<RawReply, TransportError>,
    requested: Mutex<Vec<String>>,
}

impl CannedTransport {
    fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(RawReply {
                status,
                body: body.to_string(),
            }),
            requested: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: TransportError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            requested: Mutex::new(Vec::new()),
        })
    }
}

impl AnalysisTransport for CannedTransport {
    fn post_image(&self, endpoint: &Url, _upload: ImageUpload) -> Result<RawReply, TransportError> {
        self.requested
            .lock()
            .expect("request log lock")
            .push(endpoint.to_string());
        self.reply.clone()
    }

    fn get(&self, url: &Url) -> Result<RawReply, TransportError> {
        self.requested
            .lock()
            .expect("request log lock")
            .push(url.to_string());
        self.reply.clone()
    }
}

fn upload() -> ImageUpload {
    ImageUpload {
        file_name: "scan.jpg".to_string(),
        media_type: MediaType::Jpeg,
        bytes: vec![0xFF, 0xD8, 0xFF],
    }
}

fn client(transport: Arc<CannedTransport>) -> AnalysisClient {
    AnalysisClient::new("https://tamper.example.test/api/analyze", transport)
        .expect("endpoint should be valid")
}

#[test]
fn reply_classification_tests_service_failure_is_not_a_transport_error() {
    let transport = CannedTransport::replying(200, r#"{"success":false,"error":"corrupt file"}"#);
    let reply = client(transport.clone())
        .submit(upload())
        .expect("well-formed failure is a reply");

    assert_eq!(
        reply,
        ServiceReply::Failure {
            message: Some("corrupt file".to_string())
        }
    );
    assert_eq!(
        *transport.requested.lock().expect("request log lock"),
        vec!["https://tamper.example.test/api/analyze".to_string()]
    );
}

#[test]
fn reply_classification_tests_non_2xx_is_transport_error() {
    let transport = CannedTransport::replying(400, r#"{"error":"No image provided"}"#);
    let error = client(transport)
        .submit(upload())
        .expect_err("400 is a transport failure");
    assert_eq!(error, TransportError::Status { status: 400 });
}

#[test]
fn reply_classification_tests_unparsable_body_is_malformed_reply() {
    let transport = CannedTransport::replying(200, "Internal Server Error");
    let error = client(transport)
        .submit(upload())
        .expect_err("text body is malformed");
    assert!(matches!(error, TransportError::MalformedReply(_)));
}

#[test]
fn reply_classification_tests_network_errors_propagate() {
    let transport = CannedTransport::failing(TransportError::Unreachable("refused".to_string()));
    let error = client(transport)
        .submit(upload())
        .expect_err("unreachable service");
    assert_eq!(error, TransportError::Unreachable("refused".to_string()));
}

#[test]
fn reply_classification_tests_health_probe_hits_sibling_path() {
    let transport = CannedTransport::replying(200, r#"{"status":"healthy"}"#);
    let health = client(transport.clone())
        .health()
        .expect("health reply should parse");

    assert!(health.is_healthy());
    assert_eq!(
        *transport.requested.lock().expect("request log lock"),
        vec!["https://tamper.example.test/api/health".to_string()]
    );
}

#[test]
fn reply_classification_tests_rejects_invalid_endpoints() {
    let transport = CannedTransport::replying(200, "{}");
    assert!(matches!(
        AnalysisClient::new("file:///tmp/analyze", transport),
        Err(TransportError::InvalidEndpoint(_))
    ));
}
