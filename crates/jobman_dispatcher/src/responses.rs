use std::collections::HashMap;

use jobman_protocol::{ErrorRecord, ParseError};
use serde::Serialize;

/// The outcome of the dispatcher's pre-checks, short of actually scheduling
/// a handler. Mirrors the taxonomy in spec.md section 7: `ParseError` and a
/// live error flag are the only two outcomes surfaced synchronously.
#[derive(Debug)]
pub enum DispatchError {
    NotParseable(ParseError),
    LiveError { job: String, status: u16, message: String },
    Transport(String),
}

#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub errors: HashMap<String, ErrorEntry>,
}

impl From<HashMap<String, ErrorRecord>> for ErrorsResponse {
    fn from(errors: HashMap<String, ErrorRecord>) -> Self {
        Self {
            errors: errors
                .into_iter()
                .map(|(job, record)| (job, ErrorEntry { code: record.status, message: record.message }))
                .collect(),
        }
    }
}
