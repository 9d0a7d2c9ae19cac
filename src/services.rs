//! Built-in service table

use crate::snapshot::{Snapshot, SnapshotFetcher};
use crossdiff::{Fetcher, ServiceInfo, ServiceRegistry};
use std::sync::Arc;

/// (name, description, resource types)
const BUILTIN_SERVICES: &[(&str, &str, &[&str])] = &[
    (
        "bedrock",
        "Amazon Bedrock (Foundation Models)",
        &[
            "foundation_models",
            "custom_models",
            "provisioned_throughput",
            "guardrails",
        ],
    ),
    (
        "cloudwatch",
        "Amazon CloudWatch - Monitoring and Observability",
        &["alarms", "log_groups", "dashboards"],
    ),
    (
        "ec2",
        "Amazon EC2 (Elastic Compute Cloud)",
        &[
            "instances",
            "security_groups",
            "vpcs",
            "subnets",
            "route_tables",
            "network_acls",
            "key_pairs",
        ],
    ),
    (
        "elasticbeanstalk",
        "AWS Elastic Beanstalk",
        &[
            "applications",
            "environments",
            "configuration_templates",
            "application_versions",
        ],
    ),
    (
        "eventbridge",
        "Amazon EventBridge",
        &["event_buses", "rules", "archives", "connections"],
    ),
    ("lambda", "AWS Lambda", &["functions", "layers"]),
    (
        "pinpoint",
        "Amazon Pinpoint (Customer Engagement)",
        &[
            "applications",
            "campaigns",
            "segments",
            "channels",
            "event_streams",
        ],
    ),
    ("s3", "Amazon S3 (Simple Storage Service)", &["buckets"]),
    (
        "secretsmanager",
        "AWS Secrets Manager (metadata only, values never fetched)",
        &["secrets"],
    ),
    ("service-quotas", "AWS Service Quotas", &["quotas"]),
    (
        "sns",
        "Amazon SNS (Simple Notification Service)",
        &["topics", "subscriptions"],
    ),
    ("sqs", "Amazon SQS (Simple Queue Service)", &["queues"]),
];

/// Registry of every built-in service, all served from snapshots.
pub fn builtin_registry() -> ServiceRegistry<Snapshot> {
    let fetcher: Arc<dyn Fetcher<Snapshot>> = Arc::new(SnapshotFetcher);
    let mut registry = ServiceRegistry::new();
    for (name, description, resource_types) in BUILTIN_SERVICES {
        registry.register(
            *name,
            Arc::clone(&fetcher),
            ServiceInfo::new(*description, resource_types),
        );
    }
    registry
}
