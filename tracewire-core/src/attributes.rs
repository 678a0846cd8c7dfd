//! Standard span attribute names used by the tracewire shims.

/// Attributes recorded on test example spans.
pub mod test {
    pub const LOCATION: &str = "location";
    pub const FULL_DESCRIPTION: &str = "full_description";
    pub const DESCRIBED_CLASS: &str = "described_class";
    pub const RESULT: &str = "result";
    pub const MESSAGE: &str = "message";
}

/// Attributes recorded on HTTP server spans.
pub mod http {
    pub const HTTP_METHOD: &str = "http.method";
    pub const HTTP_URL: &str = "http.url";
    pub const HTTP_ROUTE: &str = "http.route";
    pub const HTTP_STATUS_CODE: &str = "http.status_code";
}
