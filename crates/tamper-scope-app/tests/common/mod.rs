//! Shared fixtures for app integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tamper_scope_core::ImageCandidate;
use tamper_scope_upload::{
    AnalysisClient, AnalysisTransport, ImageUpload, RawReply, TransportError,
};
use url::Url;

/// Success body shared with the contract fixtures.
#[allow(dead_code)]
pub const SUCCESS_BODY: &str =
    include_str!("../../../../contracts/fixtures/analysis-success.valid.json");

/// Failure body shared with the contract fixtures.
#[allow(dead_code)]
pub const FAILURE_BODY: &str =
    include_str!("../../../../contracts/fixtures/analysis-failure.valid.json");

/// Transport replaying queued replies and recording each upload.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<RawReply, TransportError>>>,
    uploads: Mutex<Vec<ImageUpload>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    /// Queues a raw HTTP reply.
    pub fn push_reply(&self, status: u16, body: &str) {
        self.replies
            .lock()
            .expect("reply queue lock")
            .push_back(Ok(RawReply {
                status,
                body: body.to_string(),
            }));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.replies
            .lock()
            .expect("reply queue lock")
            .push_back(Err(error));
    }

    /// Uploads received so far.
    pub fn uploads(&self) -> Vec<ImageUpload> {
        self.uploads.lock().expect("upload log lock").clone()
    }
}

impl AnalysisTransport for ScriptedTransport {
    fn post_image(&self, _endpoint: &Url, upload: ImageUpload) -> Result<RawReply, TransportError> {
        self.uploads.lock().expect("upload log lock").push(upload);
        self.replies
            .lock()
            .expect("reply queue lock")
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Unreachable("no scripted reply".to_string())))
    }

    fn get(&self, _url: &Url) -> Result<RawReply, TransportError> {
        Err(TransportError::Unreachable("health not scripted".to_string()))
    }
}

/// Builds a client over a fresh scripted transport.
#[allow(dead_code)]
pub fn scripted_client() -> (AnalysisClient, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::default());
    let client = AnalysisClient::new("http://localhost:5000/api/analyze", transport.clone())
        .expect("fixture endpoint is valid");
    (client, transport)
}

/// A small valid PNG pick.
#[allow(dead_code)]
pub fn png(name: &str) -> ImageCandidate {
    ImageCandidate::new(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

/// A pick with an unsupported media type.
#[allow(dead_code)]
pub fn gif(name: &str) -> ImageCandidate {
    ImageCandidate::new(name, "image/gif", vec![b'G', b'I', b'F'])
}
