use serde::{Deserialize, Serialize};

/// What a run hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String
}

impl InvocationResult {
    pub fn success(body: impl Into<String>) -> Self {
        Self { status_code: 200, body: body.into() }
    }

    pub fn failure(body: impl Into<String>) -> Self {
        Self { status_code: 500, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
