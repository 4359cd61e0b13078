//! 服务探测：把适配器枚举出的原始服务按名称片段归类为已知类型。

use crate::adapter::ServiceAdapter;
use crate::error::Result;
use crate::models::{RawService, Service, ServiceType, StartupType};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

/// Ordered `(type, name fragments)` table; fragments are lower-case.
pub type PatternTable = Vec<(ServiceType, Vec<String>)>;

#[async_trait]
pub trait ServiceDetector: Send + Sync {
    /// Enumerate and classify. Only an enumeration failure is an error.
    async fn detect_services(&self) -> Result<Vec<Service>>;
}

/// Default fragment table for well-known database, cache and broker services.
pub fn default_patterns() -> PatternTable {
    const TABLE: &[(ServiceType, &[&str])] = &[
        (ServiceType::PostgreSQL, &["postgresql", "postgres"]),
        (ServiceType::MySQL, &["mysql"]),
        (ServiceType::MariaDB, &["mariadb"]),
        (
            ServiceType::MSSQL,
            &[
                "mssql",
                "sqlserver",
                "mssqlserver",
                "sqlagent",
                "sqlbrowser",
                "sqlwriter",
                "sqlceip",
                "sqltelemetry",
                "msdtsserver",
                "msftesql",
                "reportserver",
                "sqlserveragent",
            ],
        ),
        (ServiceType::Oracle, &["oracle", "oracleservice"]),
        (ServiceType::DB2, &["db2"]),
        (ServiceType::Firebird, &["firebird", "firebirdserver"]),
        (ServiceType::SQLite, &["sqlite"]),
        (ServiceType::MongoDB, &["mongodb", "mongo"]),
        (ServiceType::Cassandra, &["cassandra"]),
        (ServiceType::CouchDB, &["couchdb"]),
        (ServiceType::Neo4j, &["neo4j"]),
        (ServiceType::Redis, &["redis"]),
        (ServiceType::Memcached, &["memcached"]),
        (ServiceType::Elasticsearch, &["elasticsearch", "elastic"]),
        (ServiceType::InfluxDB, &["influxdb", "influx"]),
        (ServiceType::RabbitMQ, &["rabbitmq"]),
    ];
    TABLE
        .iter()
        .map(|(ty, fragments)| (*ty, fragments.iter().map(|f| f.to_string()).collect()))
        .collect()
}

/// Substring-matching detector backed by an adapter.
pub struct PatternDetector {
    adapter: Arc<dyn ServiceAdapter>,
    patterns: PatternTable,
}

impl std::fmt::Debug for PatternDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternDetector")
            .field("patterns", &self.patterns.len())
            .finish_non_exhaustive()
    }
}

impl PatternDetector {
    pub fn new(adapter: Arc<dyn ServiceAdapter>) -> Self {
        Self::with_patterns(adapter, default_patterns())
    }

    /// 自定义匹配表；片段统一转小写后参与匹配
    pub fn with_patterns(adapter: Arc<dyn ServiceAdapter>, patterns: PatternTable) -> Self {
        let patterns = patterns
            .into_iter()
            .map(|(ty, fragments)| {
                (
                    ty,
                    fragments.into_iter().map(|f| f.to_lowercase()).collect(),
                )
            })
            .collect();
        Self { adapter, patterns }
    }

    /// First type in table order with any fragment contained in the lower-cased name.
    pub fn match_service_type(&self, name: &str) -> Option<ServiceType> {
        let lowered = name.to_lowercase();
        self.patterns
            .iter()
            .find(|(_, fragments)| fragments.iter().any(|f| lowered.contains(f.as_str())))
            .map(|(ty, _)| *ty)
    }

    async fn classify(&self, raw: RawService, service_type: ServiceType) -> Service {
        let startup_type = match self.adapter.startup_type(&raw.name).await {
            Ok(startup) => startup,
            Err(e) => {
                tracing::debug!(service = %raw.name, error = %e, "startup type lookup failed, assuming manual");
                StartupType::Manual
            }
        };
        Service {
            name: raw.name,
            display_name: raw.display_name,
            status: raw.state,
            service_type,
            startup_type,
            category: service_type.category(),
        }
    }
}

#[async_trait]
impl ServiceDetector for PatternDetector {
    async fn detect_services(&self) -> Result<Vec<Service>> {
        let raw = self.adapter.list_services().await?;
        let matched: Vec<_> = raw
            .into_iter()
            .filter_map(|svc| {
                let ty = self.match_service_type(&svc.name)?;
                Some((svc, ty))
            })
            .collect();
        let services = join_all(
            matched
                .into_iter()
                .map(|(svc, ty)| self.classify(svc, ty)),
        )
        .await;
        tracing::debug!(count = services.len(), "detection pass complete");
        Ok(services)
    }
}
