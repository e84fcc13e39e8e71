//! Health Service
//!
//! Probes every adapter and datastore concurrently. Probes never retry and
//! are bounded by a short timeout, so a health check cannot hang on a dead
//! dependency.

use newsreel_core::domain::health::{ComponentHealth, HealthReport};
use sqlx::PgPool;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::context::AppContext;
use crate::db;

const DATASTORE_TIMEOUT: Duration = Duration::from_secs(3);
const REDIS_DEFAULT_PORT: u16 = 6379;

pub async fn check(ctx: &AppContext) -> HealthReport {
    let (mut components, database, redis) = tokio::join!(
        ctx.pipeline.adapters().probe_all(),
        probe_database(ctx.pool.as_ref()),
        probe_redis(ctx.config.redis_url.as_deref()),
    );
    components.extend(database);
    components.extend(redis);

    let report = HealthReport::from_components(components);
    for component in report.components.iter().filter(|c| c.detail.is_some()) {
        tracing::debug!(
            component = %component.name,
            status = %component.status,
            "Health probe: {}",
            component.detail.as_deref().unwrap_or_default()
        );
    }
    report
}

/// `None` when run history is kept in memory
async fn probe_database(pool: Option<&PgPool>) -> Option<ComponentHealth> {
    let pool = pool?;
    Some(
        match tokio::time::timeout(DATASTORE_TIMEOUT, db::ping(pool)).await {
            Ok(Ok(())) => ComponentHealth::healthy("database"),
            Ok(Err(e)) => ComponentHealth::unreachable("database", e.to_string()),
            Err(_) => ComponentHealth::unreachable("database", "timed out"),
        },
    )
}

/// Checks that the Redis port accepts connections; `None` when not configured
pub(crate) async fn probe_redis(redis_url: Option<&str>) -> Option<ComponentHealth> {
    let redis_url = redis_url?;

    let target = url::Url::parse(redis_url)
        .ok()
        .and_then(|u| Some((u.host_str()?.to_string(), u.port().unwrap_or(REDIS_DEFAULT_PORT))));
    let Some((host, port)) = target else {
        return Some(ComponentHealth::unreachable("redis", "invalid REDIS_URL"));
    };

    Some(
        match tokio::time::timeout(DATASTORE_TIMEOUT, TcpStream::connect((host.as_str(), port))).await
        {
            Ok(Ok(_)) => ComponentHealth::healthy("redis"),
            Ok(Err(e)) => ComponentHealth::unreachable("redis", e.to_string()),
            Err(_) => ComponentHealth::unreachable("redis", "timed out"),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::context;
    use newsreel_agents::mock::MockAdapters;
    use newsreel_core::domain::health::Reachability;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_all_adapters_healthy() {
        let ctx = context(&MockAdapters::new());
        let report = check(&ctx).await;

        assert_eq!(report.overall, Reachability::Healthy);
        assert_eq!(report.components.len(), 6);
        // In-memory history and no Redis: no datastore probes
        assert!(report.component("database").is_none());
        assert!(report.component("redis").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_adapter_degrades_service() {
        let mocks = MockAdapters::new();
        mocks.uploader.state.set_unreachable(true);
        let ctx = context(&mocks);

        let report = check(&ctx).await;
        assert_eq!(report.overall, Reachability::Degraded);
        assert_eq!(
            report.component("upload").map(|c| c.status),
            Some(Reachability::Unreachable)
        );
    }

    #[tokio::test]
    async fn test_probes_do_not_start_runs() {
        let mocks = MockAdapters::new();
        let ctx = context(&mocks);
        check(&ctx).await;

        assert_eq!(mocks.news.state.calls(), 0);
        assert_eq!(ctx.runs.stats().await.unwrap().runs, 0);
    }

    #[tokio::test]
    async fn test_redis_probe_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let health = probe_redis(Some(&format!("redis://127.0.0.1:{}", port)))
            .await
            .unwrap();
        assert_eq!(health.status, Reachability::Healthy);
    }

    #[tokio::test]
    async fn test_redis_probe_reports_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let health = probe_redis(Some(&format!("redis://127.0.0.1:{}", port)))
            .await
            .unwrap();
        assert_eq!(health.status, Reachability::Unreachable);
    }

    #[tokio::test]
    async fn test_redis_probe_skipped_when_unset() {
        assert!(probe_redis(None).await.is_none());
        let invalid = probe_redis(Some("::")).await.unwrap();
        assert_eq!(invalid.status, Reachability::Unreachable);
    }
}
