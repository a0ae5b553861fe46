use reqwest::StatusCode;

/// What the inbound interceptor decided about a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundVerdict {
    /// Success: hand the response to the caller untouched.
    Pass,
    /// Failure the caller handles; no navigation side effect.
    Reject,
    /// Auth failure that should send the user to the login view.
    Unauthorized,
}

/// Classify a response by status and request URL.
///
/// URLs containing any of `exempt` are never redirect-eligible, whatever the
/// status.
pub fn classify(status: StatusCode, url: &str, exempt: &[String]) -> InboundVerdict {
    if status.is_success() {
        return InboundVerdict::Pass;
    }
    if exempt.iter().any(|e| !e.is_empty() && url.contains(e.as_str())) {
        return InboundVerdict::Reject;
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return InboundVerdict::Unauthorized;
    }
    InboundVerdict::Reject
}
