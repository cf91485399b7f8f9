//! Conflict records and their retention log

use super::types::ResourceType;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// Category of a detected conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Contention on a countable resource
    Resource,
    /// A dependency is unhealthy
    Dependency,
    /// The cache is over its size budget
    Cache,
    /// Responses are slower than the threshold
    Timing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConflictSeverity {
    /// Severity for a usage ratio that already crossed its threshold
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 1.0 {
            ConflictSeverity::Critical
        } else if ratio >= 0.9 {
            ConflictSeverity::High
        } else {
            ConflictSeverity::Medium
        }
    }
}

/// Action taken to remediate a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    OptimizeConnectionPool,
    ForcedCleanup,
    CacheEviction,
    ThrottleRequests,
    WaitForDependency,
    DeferLowPriority,
    OptimizeCache,
    QueryOptimizationHint,
}

/// A detected conflict
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub id: String,
    pub kind: ConflictKind,
    pub severity: ConflictSeverity,
    pub resource_type: Option<ResourceType>,
    pub affected_systems: Vec<String>,
    pub description: String,
    pub remediation: RemediationAction,
    pub resolved: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip)]
    detected_at: Instant,
}

impl Conflict {
    pub fn new(
        kind: ConflictKind,
        severity: ConflictSeverity,
        remediation: RemediationAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            severity,
            resource_type: None,
            affected_systems: Vec::new(),
            description: description.into(),
            remediation,
            resolved: false,
            timestamp: chrono::Utc::now(),
            detected_at: Instant::now(),
        }
    }

    pub fn with_resource(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn with_affected<I, S>(mut self, systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_systems = systems.into_iter().map(Into::into).collect();
        self
    }

    /// Time since detection
    pub fn age(&self) -> Duration {
        Instant::now().duration_since(self.detected_at)
    }
}

/// Bounded-by-time audit log of conflicts
#[derive(Debug)]
pub struct ConflictLog {
    entries: Mutex<VecDeque<Conflict>>,
    retention: Duration,
}

impl ConflictLog {
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            retention,
        }
    }

    /// Store a conflict, returning its id
    pub fn record(&self, conflict: Conflict) -> String {
        let id = conflict.id.clone();
        self.entries.lock().push_back(conflict);
        id
    }

    /// Mark a conflict resolved; false when it is unknown or already purged
    pub fn mark_resolved(&self, id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|c| c.id == id) {
            Some(conflict) => {
                conflict.resolved = true;
                true
            }
            None => false,
        }
    }

    /// Drop conflicts older than the retention window
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        // Entries are appended in detection order
        while entries
            .front()
            .is_some_and(|c| c.age() >= self.retention)
        {
            entries.pop_front();
        }
        before - entries.len()
    }

    /// Unresolved conflicts
    pub fn active(&self) -> Vec<Conflict> {
        self.entries
            .lock()
            .iter()
            .filter(|c| !c.resolved)
            .cloned()
            .collect()
    }

    /// Latest `limit` conflicts, newest last
    pub fn recent(&self, limit: usize) -> Vec<Conflict> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// (active, resolved) counts
    pub fn counts(&self) -> (usize, usize) {
        let entries = self.entries.lock();
        let resolved = entries.iter().filter(|c| c.resolved).count();
        (entries.len() - resolved, resolved)
    }

    pub fn counts_by_kind(&self) -> HashMap<ConflictKind, usize> {
        let mut counts = HashMap::new();
        for conflict in self.entries.lock().iter() {
            *counts.entry(conflict.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
