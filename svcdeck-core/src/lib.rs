//! Core library for host service control: detection, classification, a TTL cache, and
//! privilege-gated lifecycle operations on top of a pluggable OS adapter.

pub mod adapter;
mod cache;
mod detector;
mod error;
mod manager;
mod models;
mod privilege;
mod settings;

pub use adapter::{native_adapter, PollPolicy, ServiceAdapter};
pub use cache::{ServiceCache, DEFAULT_CACHE_TTL};
pub use detector::{default_patterns, PatternDetector, PatternTable, ServiceDetector};
pub use error::{ErrorCode, Result, ServiceError, StateConflict};
pub use manager::{PrivilegeInfo, ServiceManager};
pub use models::{
    RawService, Service, ServiceCategory, ServiceStatus, ServiceType, StartupType,
};
pub use privilege::{PrivilegeGate, ProcessPrivilege, StaticPrivilege};
pub use settings::{ControlSettings, InMemorySettings};
