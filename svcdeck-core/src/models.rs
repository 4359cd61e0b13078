use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime state of a service as observed through the adapter.
///
/// `Restarting` is only ever reported by the manager while its own restart
/// sequence is in flight; adapters report the other four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
    Restarting,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Stopped => "stopped",
            ServiceStatus::Starting => "starting",
            ServiceStatus::Stopping => "stopping",
            ServiceStatus::Restarting => "restarting",
        };
        f.write_str(s)
    }
}

/// Persisted launch policy, independent of the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartupType {
    Automatic,
    Manual,
    Disabled,
}

impl fmt::Display for StartupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StartupType::Automatic => "automatic",
            StartupType::Manual => "manual",
            StartupType::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// Recognised service kinds. Services matching none of these are never surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    PostgreSQL,
    MySQL,
    MariaDB,
    MSSQL,
    Oracle,
    DB2,
    Firebird,
    SQLite,
    MongoDB,
    Cassandra,
    CouchDB,
    Neo4j,
    Redis,
    Memcached,
    Elasticsearch,
    InfluxDB,
    RabbitMQ,
}

impl ServiceType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceType::PostgreSQL => "PostgreSQL",
            ServiceType::MySQL => "MySQL",
            ServiceType::MariaDB => "MariaDB",
            ServiceType::MSSQL => "Microsoft SQL Server",
            ServiceType::Oracle => "Oracle Database",
            ServiceType::DB2 => "IBM DB2",
            ServiceType::Firebird => "Firebird",
            ServiceType::SQLite => "SQLite",
            ServiceType::MongoDB => "MongoDB",
            ServiceType::Cassandra => "Apache Cassandra",
            ServiceType::CouchDB => "CouchDB",
            ServiceType::Neo4j => "Neo4j",
            ServiceType::Redis => "Redis",
            ServiceType::Memcached => "Memcached",
            ServiceType::Elasticsearch => "Elasticsearch",
            ServiceType::InfluxDB => "InfluxDB",
            ServiceType::RabbitMQ => "RabbitMQ",
        }
    }

    /// Category used for grouping; types missing from the table fall back to `Other`.
    pub fn category(&self) -> ServiceCategory {
        CATEGORY_TABLE
            .iter()
            .find(|(ty, _)| ty == self)
            .map(|(_, category)| *category)
            .unwrap_or(ServiceCategory::Other)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Coarse grouping of service types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Sql,
    NoSql,
    Cache,
    Search,
    Message,
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 6] = [
        ServiceCategory::Sql,
        ServiceCategory::NoSql,
        ServiceCategory::Cache,
        ServiceCategory::Search,
        ServiceCategory::Message,
        ServiceCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::Sql => "SQL Databases",
            ServiceCategory::NoSql => "NoSQL Databases",
            ServiceCategory::Cache => "Cache & In-Memory",
            ServiceCategory::Search => "Search & Analytics",
            ServiceCategory::Message => "Message Brokers",
            ServiceCategory::Other => "Other",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ServiceCategory::Sql => "Relational database management systems",
            ServiceCategory::NoSql => "Document, graph, and column-family databases",
            ServiceCategory::Cache => "High-performance caching and in-memory stores",
            ServiceCategory::Search => "Search engines and time-series databases",
            ServiceCategory::Message => "Message queuing and streaming services",
            ServiceCategory::Other => "Services without a dedicated group",
        }
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceCategory::Sql => "sql",
            ServiceCategory::NoSql => "nosql",
            ServiceCategory::Cache => "cache",
            ServiceCategory::Search => "search",
            ServiceCategory::Message => "message",
            ServiceCategory::Other => "other",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(ServiceCategory::Sql),
            "nosql" => Ok(ServiceCategory::NoSql),
            "cache" => Ok(ServiceCategory::Cache),
            "search" => Ok(ServiceCategory::Search),
            "message" => Ok(ServiceCategory::Message),
            "other" => Ok(ServiceCategory::Other),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

const CATEGORY_TABLE: &[(ServiceType, ServiceCategory)] = &[
    (ServiceType::PostgreSQL, ServiceCategory::Sql),
    (ServiceType::MySQL, ServiceCategory::Sql),
    (ServiceType::MariaDB, ServiceCategory::Sql),
    (ServiceType::MSSQL, ServiceCategory::Sql),
    (ServiceType::Oracle, ServiceCategory::Sql),
    (ServiceType::DB2, ServiceCategory::Sql),
    (ServiceType::Firebird, ServiceCategory::Sql),
    (ServiceType::SQLite, ServiceCategory::Sql),
    (ServiceType::MongoDB, ServiceCategory::NoSql),
    (ServiceType::Cassandra, ServiceCategory::NoSql),
    (ServiceType::CouchDB, ServiceCategory::NoSql),
    (ServiceType::Neo4j, ServiceCategory::NoSql),
    (ServiceType::Redis, ServiceCategory::Cache),
    (ServiceType::Memcached, ServiceCategory::Cache),
    (ServiceType::Elasticsearch, ServiceCategory::Search),
    (ServiceType::InfluxDB, ServiceCategory::Search),
    (ServiceType::RabbitMQ, ServiceCategory::Message),
];

/// A classified service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub display_name: String,
    pub status: ServiceStatus,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub startup_type: StartupType,
    pub category: ServiceCategory,
}

/// Unclassified entry as enumerated by an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawService {
    pub name: String,
    pub display_name: String,
    pub state: ServiceStatus,
}

impl RawService {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, state: ServiceStatus) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            state,
        }
    }
}
