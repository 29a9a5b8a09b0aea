use std::time::Duration;

/// Tuning constants shared by the worker pipeline, the ingest orchestrator
/// and the progress stream bridge.

/// Simulated per-page processing delay.
pub const PAGE_DELAY: Duration = Duration::from_millis(400);

/// Simulated page count used when no extractor is wired up to report a
/// real one.
pub const SIMULATED_PAGE_COUNT: i32 = 12;

/// Hard deadline on the ingest-side dispatch RPC to the worker.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

/// SSE heartbeat interval.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

/// Maximum lifetime of one progress stream connection.
pub const STREAM_MAX_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Value of the SSE `retry:` directive, in milliseconds.
pub const SSE_RETRY_MS: u64 = 3000;

/// Upload size cap, in bytes (50 MiB).
pub const UPLOAD_SIZE_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

/// Media types accepted by the ingest orchestrator.
pub const ALLOWED_MIME_TYPES: &[&str] =
    &["application/pdf", "image/png", "image/jpeg", "image/webp"];

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_accepts_pdf_rejects_text() {
        assert!(is_allowed_mime_type("application/pdf"));
        assert!(!is_allowed_mime_type("text/plain"));
    }
}
