//! Cluster Catalog
//!
//! The fixed lookup table of analytics backends a query may target. An
//! unknown key is a lookup failure reported to the caller, never a
//! crash.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use shipmate_core::{CoreError, CoreResult};

/// Configuration details of one analytics cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Stable key used by tools and the model (e.g. "devops")
    pub key: String,
    /// Cluster endpoint URI
    pub endpoint: String,
    /// Database name within the cluster
    pub database: String,
    /// What the data in this cluster is good for
    pub description: String,
}

impl ClusterConfig {
    pub fn new(
        key: impl Into<String>,
        endpoint: impl Into<String>,
        database: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
            database: database.into(),
            description: description.into(),
        }
    }
}

/// Fixed catalog of clusters, keyed by string. Built once at startup.
#[derive(Debug, Clone)]
pub struct ClusterCatalog {
    clusters: HashMap<String, ClusterConfig>,
    /// Insertion order for deterministic listings
    order: Vec<String>,
}

impl ClusterCatalog {
    /// Build a catalog from an explicit cluster list.
    pub fn new(clusters: Vec<ClusterConfig>) -> Self {
        let order: Vec<String> = clusters.iter().map(|c| c.key.clone()).collect();
        let clusters = clusters.into_iter().map(|c| (c.key.clone(), c)).collect();
        Self { clusters, order }
    }

    /// The default cluster table.
    pub fn builtin() -> Self {
        Self::new(vec![
            ClusterConfig::new(
                "deployments",
                "https://deploy-telemetry.westus2.kusto.example.net/",
                "DeployRequests",
                "Deployment requests linked with build ids",
            ),
            ClusterConfig::new(
                "devops",
                "https://devops-analytics.eastus.kusto.example.net/",
                "DevOpsAnalytics",
                "Builds, pull requests, commits, and work items",
            ),
            ClusterConfig::new(
                "feedback",
                "https://risk-feedback.eastus.kusto.example.net/",
                "RiskReports",
                "Risk reports comparing sequential builds of a deployment request",
            ),
            ClusterConfig::new(
                "applogs",
                "https://assistant-logs.westus2.kusto.example.net/",
                "AssistantLogs",
                "Application log information for the assistant itself",
            ),
        ])
    }

    /// Look up a cluster by key.
    pub fn get(&self, key: &str) -> CoreResult<&ClusterConfig> {
        if key.trim().is_empty() {
            return Err(CoreError::validation(
                "The 'cluster' parameter cannot be empty",
            ));
        }
        self.clusters
            .get(key)
            .ok_or_else(|| CoreError::unknown_cluster(key))
    }

    /// Cluster keys in catalog order.
    pub fn keys(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Render the key/database/description listing shown to the model.
    pub fn describe(&self) -> String {
        let listing: Vec<serde_json::Value> = self
            .order
            .iter()
            .filter_map(|key| self.clusters.get(key))
            .map(|c| {
                serde_json::json!({
                    "cluster": c.key,
                    "database": c.database,
                    "description": c.description,
                })
            })
            .collect();

        serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Default for ClusterCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = ClusterCatalog::builtin();
        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.keys(),
            vec!["deployments", "devops", "feedback", "applogs"]
        );

        let devops = catalog.get("devops").unwrap();
        assert_eq!(devops.database, "DevOpsAnalytics");
    }

    #[test]
    fn test_unknown_key_is_a_lookup_failure() {
        let catalog = ClusterCatalog::builtin();
        let err = catalog.get("nonexistent").unwrap_err();
        assert!(matches!(err, CoreError::UnknownCluster(key) if key == "nonexistent"));
    }

    #[test]
    fn test_empty_key_is_a_validation_error() {
        let catalog = ClusterCatalog::builtin();
        let err = catalog.get("  ").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn test_describe_lists_every_cluster() {
        let catalog = ClusterCatalog::builtin();
        let listing: serde_json::Value =
            serde_json::from_str(&catalog.describe()).unwrap();
        let entries = listing.as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["cluster"], "deployments");
        assert!(entries[1]["description"]
            .as_str()
            .unwrap()
            .contains("pull requests"));
    }
}
