// ABOUTME: Test support utilities.
// ABOUTME: Builders for digests, images, and repositories plus tracing setup.

use chrono::{DateTime, TimeZone, Utc};
use registry_gc::types::{Digest, Image, RepositoryName};
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter =
            EnvFilter::from_default_env().add_directive("registry_gc=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Deterministic sha256 digest for `n`.
#[allow(dead_code)]
pub fn digest(n: u64) -> Digest {
    Digest::parse(&format!("sha256:{n:064x}")).unwrap()
}

/// Push time `secs` seconds after 2024-01-01T00:00:00Z.
#[allow(dead_code)]
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

/// Image `n` pushed at `at(secs)` with the given tags.
#[allow(dead_code)]
pub fn image(n: u64, tags: &[&str], secs: i64) -> Image {
    Image::new(digest(n), tags.iter().copied(), at(secs))
}

#[allow(dead_code)]
pub fn repo(name: &str) -> RepositoryName {
    RepositoryName::new(name).unwrap()
}
