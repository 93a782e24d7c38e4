//! Database connector
//!
//! Builds the connection pool for the lifetime of one invocation and
//! verifies the connection up front. A connection failure propagates to the
//! caller, which reports and terminates; there are no retries.

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// Hosted services terminate plain TCP; require TLS for them even when the
/// configuration does not say so explicitly.
fn needs_tls(config: &DatabaseConfig) -> bool {
    config.require_tls
        || config.host.ends_with(".supabase.co")
        || config.host.ends_with(".neon.tech")
}

/// Create a connection pool and verify it with a test query
pub async fn connect(config: &DatabaseConfig) -> AppResult<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.database.clone());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    let use_tls = needs_tls(config);
    let pool = if use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(Runtime::Tokio1), tls)
            .map_err(|e| AppError::Config(format!("Failed to create TLS pool: {}", e)))?
    } else {
        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| AppError::Config(format!("Failed to create pool: {}", e)))?
    };

    // Verify before handing the pool out, so auth and network problems
    // surface as a ConnectionFailure instead of a mid-report query error.
    let client = pool
        .get()
        .await
        .map_err(|e| AppError::Connection(format!("Failed to connect: {}", e)))?;
    client
        .query_one("SELECT 1", &[])
        .await
        .map_err(|e| AppError::Connection(format!("Connection test failed: {}", e)))?;
    drop(client);

    debug!(host = %config.host, port = config.port, tls = use_tls, "connection verified");
    info!(
        "Connected to database {} at {} (TLS: {})",
        config.database, config.host, use_tls
    );
    Ok(pool)
}
