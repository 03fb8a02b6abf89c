//! Data exchanged with the discovery registry and its agents

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a single registry health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passing,
    Warning,
    Critical,
    Unknown,
}

/// A health check as stored by the registry
///
/// Checks without a `service_id` belong to the node itself (system checks,
/// e.g. the agent's own liveness); checks with one belong to a service
/// instance running on that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    /// Node the check is registered on
    pub node: String,
    pub check_id: String,
    #[serde(default)]
    pub name: String,
    /// Owning service instance, `None` for node-level checks
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    pub status: CheckStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub output: String,
}

impl Check {
    /// Create a node-level check
    pub fn node(node: impl Into<String>, check_id: impl Into<String>, status: CheckStatus) -> Self {
        let check_id = check_id.into();
        Self {
            node: node.into(),
            name: check_id.clone(),
            check_id,
            service_id: None,
            service_name: None,
            status,
            notes: String::new(),
            output: String::new(),
        }
    }

    /// Create a check attached to a service instance
    pub fn service(
        node: impl Into<String>,
        service_name: impl Into<String>,
        service_id: impl Into<String>,
        status: CheckStatus,
    ) -> Self {
        let service_id = service_id.into();
        Self {
            node: node.into(),
            check_id: format!("service:{service_id}"),
            name: String::new(),
            service_id: Some(service_id),
            service_name: Some(service_name.into()),
            status,
            notes: String::new(),
            output: String::new(),
        }
    }

    /// Whether this is a node-level (system) check
    pub fn is_system(&self) -> bool {
        self.service_id.as_deref().map_or(true, str::is_empty)
    }
}

/// A discovered, routable service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateServer {
    /// Registry node hosting the instance
    pub node: String,
    /// Registry service id of the instance
    pub instance_id: String,
    /// Service (application) name shared by all instances of the service
    pub app_name: String,
    pub address: String,
    pub port: u16,
}

impl CandidateServer {
    pub fn new(
        node: impl Into<String>,
        instance_id: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            instance_id: instance_id.into(),
            app_name: app_name.into(),
            address: String::new(),
            port: 0,
        }
    }

    /// Set the network endpoint of the instance
    pub fn with_endpoint(mut self, address: impl Into<String>, port: u16) -> Self {
        self.address = address.into();
        self.port = port;
        self
    }

    /// `address:port` of the instance
    pub fn addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Gossip status of a cluster agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    None,
    Alive,
    Leaving,
    Left,
    Failed,
}

/// A member of the gossip pool (client or server agent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Agent name, equal to the registry node name
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub status: MemberStatus,
}

impl Member {
    pub fn new(name: impl Into<String>, address: impl Into<String>, status: MemberStatus) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: 8301,
            status,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.status == MemberStatus::Alive
    }
}

/// Application status as reported by a health indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Up,
    Down,
    OutOfService,
    Unknown,
    /// Application-defined status code
    Custom(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Up => f.write_str("UP"),
            Status::Down => f.write_str("DOWN"),
            Status::OutOfService => f.write_str("OUT_OF_SERVICE"),
            Status::Unknown => f.write_str("UNKNOWN"),
            Status::Custom(code) => f.write_str(code),
        }
    }
}

/// Current health of the local application
#[derive(Debug, Clone, PartialEq)]
pub struct Health {
    pub status: Status,
    /// Free-form diagnostics, forwarded as the check note
    pub details: BTreeMap<String, serde_json::Value>,
}

impl Health {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            details: BTreeMap::new(),
        }
    }

    pub fn up() -> Self {
        Self::new(Status::Up)
    }

    pub fn down() -> Self {
        Self::new(Status::Down)
    }

    pub fn unknown() -> Self {
        Self::new(Status::Unknown)
    }

    /// Attach a diagnostic detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Render the details as the note sent along with a check update
    pub fn note(&self) -> String {
        serde_json::to_string(&self.details).unwrap_or_default()
    }
}

/// Outcome of a TTL check update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    Pass,
    Warn,
    Fail,
}

impl CheckOutcome {
    /// Map an application status to the TTL check update to send
    pub fn for_status(status: &Status) -> Self {
        match status {
            Status::Up => CheckOutcome::Pass,
            Status::Unknown => CheckOutcome::Warn,
            _ => CheckOutcome::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckOutcome::Pass => "pass",
            CheckOutcome::Warn => "warn",
            CheckOutcome::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
