use super::Environment;
use super::security::{is_private_host, is_standard_port};
use chrono::{DateTime, Utc};
use reqwest::redirect::Policy;
use serde::Serialize;
use std::time::{Duration, Instant};

pub const DEFAULT_HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const REDACTED_FAILURE: &str = "Health check failed";

#[derive(Debug, Clone)]
pub struct HealthCheckOptions {
    pub environment: Environment,
    pub allow_private_networks: bool,
    pub allow_non_standard_ports: bool,
    pub timeout: Duration,
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            allow_private_networks: false,
            allow_non_standard_ports: false,
            timeout: DEFAULT_HEALTH_CHECK_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    /// HTTP status when a response was received
    pub status: Option<u16>,
    pub latency: Duration,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl HealthCheckResult {
    fn failed(started: Instant, status: Option<u16>, detail: String, options: &HealthCheckOptions) -> Self {
        let error = if options.environment.is_production() {
            REDACTED_FAILURE.to_string()
        } else {
            detail
        };

        Self {
            healthy: false,
            status,
            latency: started.elapsed(),
            checked_at: Utc::now(),
            error: Some(error),
        }
    }
}

/// Issues one GET against `base_url` and reports reachability.
///
/// Any response below 500 means the API answered; a 404 only says the root
/// resource is absent. Server errors, timeouts and connection failures are
/// unhealthy. Private targets and non-standard ports are refused before any
/// request is made unless `options` allow them. Redirects are not followed.
pub async fn validate_health_check(base_url: &str, options: &HealthCheckOptions) -> HealthCheckResult {
    let started = Instant::now();

    let url = match reqwest::Url::parse(base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) => {
            return HealthCheckResult::failed(
                started,
                None,
                format!("Unsupported scheme '{}'", url.scheme()),
                options,
            );
        }
        Err(e) => {
            return HealthCheckResult::failed(started, None, format!("Invalid URL: {e}"), options);
        }
    };

    let Some(host) = url.host_str() else {
        return HealthCheckResult::failed(started, None, "URL has no host".to_string(), options);
    };

    if !options.allow_private_networks && is_private_host(host) {
        log::warn!("Refusing health check against private address {host}");
        return HealthCheckResult::failed(
            started,
            None,
            format!("{host} is a private or loopback address"),
            options,
        );
    }

    if let Some(port) = url.port_or_known_default() {
        if !options.allow_non_standard_ports && !is_standard_port(port) {
            log::warn!("Refusing health check against non-standard port {port}");
            return HealthCheckResult::failed(
                started,
                None,
                format!("Port {port} is not allowed"),
                options,
            );
        }
    }

    let client = match reqwest::Client::builder()
        .redirect(Policy::none())
        .timeout(options.timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return HealthCheckResult::failed(
                started,
                None,
                format!("Failed to build HTTP client: {e}"),
                options,
            );
        }
    };

    log::debug!("Running health check against {url}");

    match client.get(url.clone()).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            if status < 500 {
                log::info!("Health check passed for {url} with status {status}");
                HealthCheckResult {
                    healthy: true,
                    status: Some(status),
                    latency: started.elapsed(),
                    checked_at: Utc::now(),
                    error: None,
                }
            } else {
                log::warn!("Health check for {url} returned status {status}");
                HealthCheckResult::failed(
                    started,
                    Some(status),
                    format!("Server responded with status {status}"),
                    options,
                )
            }
        }
        Err(e) => {
            let detail = if e.is_timeout() {
                format!("Request timed out after {:?}", options.timeout)
            } else {
                format!("Request failed: {e}")
            };
            log::warn!("Health check for {url} failed: {detail}");
            HealthCheckResult::failed(started, None, detail, options)
        }
    }
}
