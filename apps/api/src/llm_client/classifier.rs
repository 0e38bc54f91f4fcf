//! Attempt Classifier: labels a failed attempt so the executor knows
//! whether to rotate, back off, or stop.

use std::fmt;

use thiserror::Error;

use crate::llm_client::extractor::ExtractionError;
use crate::llm_client::provider::ProviderError;

/// Message fragments that signal quota / throughput exhaustion.
const RATE_LIMIT_MARKERS: &[&str] = &["429", "quota", "rate limit", "resource_exhausted"];

/// Everything that can go wrong within one attempt. Transport failures and
/// unusable output share this single channel into the retry loop.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    RateLimited,
    Transient,
    Fatal,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Classification::RateLimited => "rate_limited",
            Classification::Transient => "transient",
            Classification::Fatal => "fatal",
        })
    }
}

/// Pure function of the error's status code and message.
pub fn classify(error: &AttemptError) -> Classification {
    let provider_error = match error {
        AttemptError::Extraction(_) => return Classification::Transient,
        AttemptError::Provider(e) => e,
    };

    if provider_error.status() == Some(429)
        || provider_error.message().is_some_and(mentions_rate_limit)
    {
        return Classification::RateLimited;
    }

    match provider_error {
        ProviderError::Network(_) | ProviderError::Timeout(_) | ProviderError::Envelope(_) => {
            Classification::Transient
        }
        ProviderError::Status { status, .. } if *status == 408 || *status >= 500 => {
            Classification::Transient
        }
        ProviderError::Status { .. } | ProviderError::InvalidRequest(_) => Classification::Fatal,
    }
}

fn mentions_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| lower.contains(marker))
}
