use std::fmt;

const RATE_LIMIT_MARKER: &str = "429";
const QUOTA_MARKERS: [&str; 2] = ["quota", "limit"];

/// Why a single classification attempt failed. Only selects a backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCategory {
    RateLimited,
    QuotaExceeded,
    TransientOther,
    /// The call succeeded but the answer was not one of the three codes.
    InvalidOutput,
}

impl FailureCategory {
    /// Infers the category of a transport-level error from its text.
    ///
    /// The rate-limit marker wins over the quota keywords, which are matched
    /// case-insensitively.
    pub fn from_error_text(text: &str) -> Self {
        if text.contains(RATE_LIMIT_MARKER) {
            return FailureCategory::RateLimited;
        }
        let lower = text.to_lowercase();
        if QUOTA_MARKERS.iter().any(|marker| lower.contains(marker)) {
            FailureCategory::QuotaExceeded
        } else {
            FailureCategory::TransientOther
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::RateLimited => "rate_limited",
            FailureCategory::QuotaExceeded => "quota_exceeded",
            FailureCategory::TransientOther => "transient_other",
            FailureCategory::InvalidOutput => "invalid_output",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::FailureCategory;

    #[test]
    fn status_429_is_rate_limited() {
        assert_eq!(
            FailureCategory::from_error_text("http status 429 Too Many Requests"),
            FailureCategory::RateLimited
        );
    }

    #[test]
    fn rate_limit_marker_beats_quota_keywords() {
        assert_eq!(
            FailureCategory::from_error_text("429: Quota exceeded for metric"),
            FailureCategory::RateLimited
        );
    }

    #[test]
    fn quota_keywords_are_case_insensitive() {
        assert_eq!(
            FailureCategory::from_error_text("RESOURCE_EXHAUSTED: QUOTA"),
            FailureCategory::QuotaExceeded
        );
        assert_eq!(
            FailureCategory::from_error_text("daily Limit reached"),
            FailureCategory::QuotaExceeded
        );
    }

    #[test]
    fn other_text_is_transient() {
        assert_eq!(
            FailureCategory::from_error_text("connection reset by peer"),
            FailureCategory::TransientOther
        );
    }
}
