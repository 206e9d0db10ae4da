//! SQLite entity store implementation
//!
//! This module provides a SQLite-based implementation of the `EntityStore` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Projection workers share one pool
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Per-agent replacements (SAP instances, subscriptions) run in a single
//! transaction, so readers never observe a half-replaced list.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{EntityStore, HealthStatus};
use super::error::{StorageError, StorageResult};
use super::schema::{
    Cluster, Host, HostSizing, HostTelemetry, SapSystemInstance, SlesSubscription,
};

/// SQLite entity store
pub struct SqliteEntityStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteEntityStore {
    /// Open (or create) the database and run migrations
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use fact_hub::storage::sqlite::SqliteEntityStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteEntityStore::new("./facts.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite entity store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn cluster_from_row(row: &SqliteRow) -> StorageResult<Cluster> {
        let cluster_type: String = row.try_get("cluster_type")?;

        Ok(Cluster {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            cluster_type: cluster_type.parse().unwrap_or_default(),
            sid: row.try_get("sid")?,
            resources_number: row.try_get::<i64, _>("resources_number")? as u32,
            hosts_number: row.try_get::<i64, _>("hosts_number")? as u32,
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
        })
    }

    fn host_from_row(row: &SqliteRow) -> StorageResult<Host> {
        let ip_addresses: String = row.try_get("ip_addresses")?;

        Ok(Host {
            agent_id: row.try_get("agent_id")?,
            hostname: row.try_get("hostname")?,
            ip_addresses: serde_json::from_str(&ip_addresses)?,
            agent_version: row.try_get("agent_version")?,
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
        })
    }

    fn instance_from_row(row: &SqliteRow) -> StorageResult<SapSystemInstance> {
        let system_type: String = row.try_get("system_type")?;

        Ok(SapSystemInstance {
            agent_id: row.try_get("agent_id")?,
            sid: row.try_get("sid")?,
            system_type: system_type
                .parse()
                .map_err(StorageError::SerializationError)?,
            instance_number: row.try_get("instance_number")?,
            features: row.try_get("features")?,
            hostname: row.try_get("hostname")?,
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
        })
    }

    fn subscription_from_row(row: &SqliteRow) -> StorageResult<SlesSubscription> {
        Ok(SlesSubscription {
            agent_id: row.try_get("agent_id")?,
            identifier: row.try_get("identifier")?,
            version: row.try_get("version")?,
            arch: row.try_get("arch")?,
            status: row.try_get("status")?,
            expires_at: row
                .try_get::<Option<i64>, _>("expires_at")?
                .map(Self::millis_to_timestamp),
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
        })
    }

    fn telemetry_from_row(row: &SqliteRow) -> StorageResult<HostTelemetry> {
        Ok(HostTelemetry {
            agent_id: row.try_get("agent_id")?,
            hostname: row.try_get("hostname")?,
            cpu_count: row.try_get::<Option<i64>, _>("cpu_count")?.map(|v| v as u32),
            socket_count: row.try_get::<Option<i64>, _>("socket_count")?.map(|v| v as u32),
            total_memory_mb: row
                .try_get::<Option<i64>, _>("total_memory_mb")?
                .map(|v| v as u64),
            sles_version: row.try_get("sles_version")?,
            cloud_provider: row.try_get("cloud_provider")?,
            updated_at: Self::millis_to_timestamp(row.try_get("updated_at")?),
        })
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    #[instrument(skip(self, cluster), fields(cluster_id = %cluster.id))]
    async fn upsert_cluster(&self, cluster: Cluster) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clusters (
                id, name, cluster_type, sid, resources_number, hosts_number, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                cluster_type = excluded.cluster_type,
                sid = excluded.sid,
                resources_number = excluded.resources_number,
                hosts_number = excluded.hosts_number,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&cluster.id)
        .bind(&cluster.name)
        .bind(cluster.cluster_type.to_string())
        .bind(&cluster.sid)
        .bind(cluster.resources_number as i64)
        .bind(cluster.hosts_number as i64)
        .bind(Self::timestamp_to_millis(&cluster.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_cluster(&self, id: &str) -> StorageResult<Option<Cluster>> {
        let row = sqlx::query("SELECT * FROM clusters WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::cluster_from_row).transpose()
    }

    async fn list_clusters(&self) -> StorageResult<Vec<Cluster>> {
        let rows = sqlx::query("SELECT * FROM clusters ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::cluster_from_row).collect()
    }

    #[instrument(skip(self, host), fields(agent_id = %host.agent_id))]
    async fn upsert_host(&self, host: Host) -> StorageResult<()> {
        let ip_addresses = serde_json::to_string(&host.ip_addresses)?;

        sqlx::query(
            r#"
            INSERT INTO hosts (agent_id, hostname, ip_addresses, agent_version, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (agent_id) DO UPDATE SET
                hostname = excluded.hostname,
                ip_addresses = excluded.ip_addresses,
                agent_version = excluded.agent_version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&host.agent_id)
        .bind(&host.hostname)
        .bind(ip_addresses)
        .bind(&host.agent_version)
        .bind(Self::timestamp_to_millis(&host.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_host(&self, agent_id: &str) -> StorageResult<Option<Host>> {
        let row = sqlx::query("SELECT * FROM hosts WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::host_from_row).transpose()
    }

    async fn list_hosts(&self) -> StorageResult<Vec<Host>> {
        let rows = sqlx::query("SELECT * FROM hosts ORDER BY agent_id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::host_from_row).collect()
    }

    #[instrument(skip(self, instances), fields(count = instances.len()))]
    async fn replace_sap_system_instances(
        &self,
        agent_id: &str,
        instances: Vec<SapSystemInstance>,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sap_system_instances WHERE agent_id = ?")
            .bind(agent_id)
            .execute(&mut *tx)
            .await?;

        for instance in instances {
            sqlx::query(
                r#"
                INSERT INTO sap_system_instances (
                    agent_id, sid, system_type, instance_number, features, hostname, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (agent_id, sid, instance_number) DO UPDATE SET
                    system_type = excluded.system_type,
                    features = excluded.features,
                    hostname = excluded.hostname,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(agent_id)
            .bind(&instance.sid)
            .bind(instance.system_type.to_string())
            .bind(&instance.instance_number)
            .bind(&instance.features)
            .bind(&instance.hostname)
            .bind(Self::timestamp_to_millis(&instance.updated_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_sap_system_instances(&self) -> StorageResult<Vec<SapSystemInstance>> {
        let rows = sqlx::query(
            "SELECT * FROM sap_system_instances ORDER BY sid, agent_id, instance_number",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::instance_from_row).collect()
    }

    #[instrument(skip(self, subscriptions), fields(count = subscriptions.len()))]
    async fn replace_subscriptions(
        &self,
        agent_id: &str,
        subscriptions: Vec<SlesSubscription>,
    ) -> StorageResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sles_subscriptions WHERE agent_id = ?")
            .bind(agent_id)
            .execute(&mut *tx)
            .await?;

        for subscription in subscriptions {
            sqlx::query(
                r#"
                INSERT INTO sles_subscriptions (
                    agent_id, identifier, version, arch, status, expires_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (agent_id, identifier) DO UPDATE SET
                    version = excluded.version,
                    arch = excluded.arch,
                    status = excluded.status,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(agent_id)
            .bind(&subscription.identifier)
            .bind(&subscription.version)
            .bind(&subscription.arch)
            .bind(&subscription.status)
            .bind(subscription.expires_at.as_ref().map(Self::timestamp_to_millis))
            .bind(Self::timestamp_to_millis(&subscription.updated_at))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_subscriptions(&self, agent_id: &str) -> StorageResult<Vec<SlesSubscription>> {
        let rows = sqlx::query(
            "SELECT * FROM sles_subscriptions WHERE agent_id = ? ORDER BY identifier",
        )
        .bind(agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::subscription_from_row).collect()
    }

    #[instrument(skip(self, sizing))]
    async fn update_host_sizing(&self, agent_id: &str, sizing: HostSizing) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO host_telemetry (
                agent_id, hostname, cpu_count, socket_count, total_memory_mb,
                sles_version, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (agent_id) DO UPDATE SET
                hostname = excluded.hostname,
                cpu_count = excluded.cpu_count,
                socket_count = excluded.socket_count,
                total_memory_mb = excluded.total_memory_mb,
                sles_version = excluded.sles_version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(agent_id)
        .bind(&sizing.hostname)
        .bind(sizing.cpu_count.map(|v| v as i64))
        .bind(sizing.socket_count.map(|v| v as i64))
        .bind(sizing.total_memory_mb.map(|v| v as i64))
        .bind(&sizing.sles_version)
        .bind(Self::timestamp_to_millis(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_cloud_provider(
        &self,
        agent_id: &str,
        provider: Option<String>,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO host_telemetry (agent_id, cloud_provider, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (agent_id) DO UPDATE SET
                cloud_provider = excluded.cloud_provider,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(agent_id)
        .bind(&provider)
        .bind(Self::timestamp_to_millis(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_host_telemetry(&self, agent_id: &str) -> StorageResult<Option<HostTelemetry>> {
        let row = sqlx::query("SELECT * FROM host_telemetry WHERE agent_id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::telemetry_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite entity store operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }
}
