use std::time::Duration;

/// User-Agent sent with every outbound request
pub fn user_agent() -> String {
    format!("courier/{}", crate::pkg_version())
}

/// Build the HTTP client shared by outbound transports.
///
/// - **Connection pooling**: idle connections are kept per host and reused
/// - **Compression**: gzip, deflate, brotli and zstd responses are decoded
/// - **Timeouts**: `timeout` per request, 10s to connect
/// - **Security**: Rustls for TLS (no OpenSSL dependency)
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        // Timeouts
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        // Compression
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .zstd(true)
        // Security
        .https_only(false)
        .use_rustls_tls()
        .user_agent(user_agent())
        .build()
}
