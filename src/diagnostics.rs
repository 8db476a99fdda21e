//! Plain-text introspection over HTTP.
//!
//! `GET /` records two sample observations for `8.8.8.8`, then reports the
//! store counters, how many undecodable records have been seen, and what the
//! cache returns for that address and for one that was never observed.

use crate::resolver::ReverseDnsCache;
use axum::{extract::State, routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

const SAMPLE_IP: &str = "8.8.8.8";
const SAMPLE_HOSTNAMES: [&str; 2] = ["k8.google.com", "www.google.com"];
const SAMPLE_TTL: u64 = 10;
const UNSET_IP: &str = "8.8.8.1";

/// Builds the diagnostics router.
pub fn router(resolver: Arc<ReverseDnsCache>) -> Router {
    Router::new().route("/", get(report)).with_state(resolver)
}

/// Serves the diagnostics router until the listener fails.
pub async fn serve(listener: TcpListener, resolver: Arc<ReverseDnsCache>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Diagnostics endpoint listening");
    }
    axum::serve(listener, router(resolver)).await
}

async fn report(State(resolver): State<Arc<ReverseDnsCache>>) -> String {
    debug!("Rendering diagnostics report");
    render_report(&resolver)
}

/// Renders the report body. Observation failures are written into the
/// report instead of failing the request.
pub fn render_report(resolver: &ReverseDnsCache) -> String {
    let mut out = String::new();

    for hostname in SAMPLE_HOSTNAMES {
        if let Err(e) = resolver.observe(SAMPLE_IP, hostname, SAMPLE_TTL) {
            out.push_str(&format!("observe {} {}: {}\n", SAMPLE_IP, hostname, e));
        }
    }

    let store = resolver.store();
    out.push_str(&format!("Stats: {}\n", store.stats()));
    out.push_str(&format!("Len: {}\n", store.len()));
    out.push_str(&format!("Capacity: {}\n", store.capacity()));
    out.push_str(&format!("Corrupt: {}\n", resolver.corrupt_records()));

    let raw = resolver
        .raw(SAMPLE_IP)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default();
    out.push_str(&format!("get: {}\n", raw));

    for ip in [SAMPLE_IP, UNSET_IP] {
        let found = resolver.lookup(ip);
        out.push_str(&format!(
            "get: {} {}\n",
            found.as_deref().unwrap_or(""),
            found.is_some()
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ShardStore, StoreConfig};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn create_resolver() -> Arc<ReverseDnsCache> {
        let store = ShardStore::new(StoreConfig::default().with_shards(8)).unwrap();
        Arc::new(ReverseDnsCache::new(Arc::new(store)))
    }

    #[test]
    fn test_render_report() {
        let resolver = create_resolver();
        let report = render_report(&resolver);
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("Stats: hits="));
        assert_eq!(lines[1], "Len: 1");
        assert!(lines[2].starts_with("Capacity: "));
        assert_eq!(lines[3], "Corrupt: 0");
        assert_eq!(
            lines[4],
            r#"get: {"DNS":{"k8.google.com":10,"www.google.com":10}}"#
        );
        assert_eq!(lines[5], "get: k8.google.com,www.google.com true");
        assert_eq!(lines[6], "get:  false");
    }

    #[test]
    fn test_render_report_is_repeatable() {
        let resolver = create_resolver();
        render_report(&resolver);
        let report = render_report(&resolver);

        assert!(report.contains("Len: 1\n"));
        assert!(report.contains("get: k8.google.com,www.google.com true\n"));
    }

    #[test]
    fn test_render_report_with_corrupt_record() {
        let resolver = create_resolver();
        resolver.store().put(SAMPLE_IP, "garbage").unwrap();

        let report = render_report(&resolver);

        assert!(report.starts_with("observe 8.8.8.8 k8.google.com: corrupt record"));
        // Both sample observations were refused.
        assert!(report.contains("Corrupt: 2\n"));
        assert!(report.contains("get: garbage\n"));
        assert!(report.ends_with("get:  false\nget:  false\n"));
    }

    #[tokio::test]
    async fn test_http_get_root() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, create_resolver()));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();

        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut response))
            .await
            .unwrap()
            .unwrap();
        let response = String::from_utf8_lossy(&response);

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.contains("text/plain"));
        assert!(response.contains("get: k8.google.com,www.google.com true"));
    }
}
