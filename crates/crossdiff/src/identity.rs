//! Cross-account identity resolution
//!
//! Account-scoped identifiers (ARNs, instance ids, group ids) never match
//! between two accounts, so each resource kind gets a strategy that derives a
//! key both accounts agree on. Strategies only choose the key and the extra
//! account-specific fields to ignore; everything else is shared.

use crate::differ::FieldFilter;
use crate::error::Result;
use crate::resource::Resource;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Fields tried, in order, by the generic strategy after the ARN.
const ID_FIELDS: &[&str] = &["id", "resource_id", "name", "bucket_name", "instance_id"];

/// Hex characters kept from the content hash.
const HASH_LEN: usize = 16;

/// Strategy producing a stable, cross-account key for a resource.
pub trait IdentityResolver: Send + Sync + fmt::Debug {
    /// Short name of the strategy, for logs.
    fn kind(&self) -> &'static str;

    /// Service-specific key, if the resource carries one.
    fn logical_key(&self, _resource: &Resource) -> Option<String> {
        None
    }

    /// Account-specific fields to ignore when diffing this kind.
    fn excluded_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Resolve the key, falling back to the generic strategy.
    fn resolve(&self, resource: &Resource, filter: &FieldFilter) -> Result<String> {
        match self.logical_key(resource) {
            Some(key) => Ok(key),
            None => Ok(default_identity(resource, filter)),
        }
    }
}

/// Generic identity: ARN, then a well-known id field, then a content hash.
///
/// A resource with no usable content gets its address as identity. Such a
/// key never matches the other account and is logged.
pub fn default_identity(resource: &Resource, filter: &FieldFilter) -> String {
    if let Some(arn) = resource.arn() {
        return arn;
    }

    if let Some(id) = ID_FIELDS.iter().find_map(|f| resource.get_str(f)) {
        return id;
    }

    if let Some(hash) = content_hash(resource, filter) {
        return hash;
    }

    let key = format!("object:{resource:p}");
    log::warn!("Resource has no identifying fields, using {key}; it will not match across accounts");
    key
}

/// Order-independent hash of the resource's non-empty top-level values.
fn content_hash(resource: &Resource, filter: &FieldFilter) -> Option<String> {
    let Value::Object(stripped) = filter.strip(&resource.to_value()) else {
        return None;
    };

    let mut entries: Vec<String> = stripped
        .iter()
        .filter(|(_, v)| !is_empty_value(v))
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if entries.is_empty() {
        return None;
    }
    entries.sort();
    entries.dedup();

    let mut hasher = blake3::Hasher::new();
    for entry in &entries {
        hasher.update(entry.as_bytes());
        hasher.update(b"\0");
    }
    let hex = hasher.finalize().to_hex();
    Some(format!("hash:{}", &hex[..HASH_LEN]))
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(_) | Value::Number(_) => false,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Generic strategy with no service-specific key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl IdentityResolver for DefaultResolver {
    fn kind(&self) -> &'static str {
        "default"
    }
}

/// Key taken from the first non-empty of a list of name fields.
#[derive(Debug, Clone, Copy)]
pub struct NameFieldResolver {
    kind: &'static str,
    keys: &'static [&'static str],
    excluded: &'static [&'static str],
}

impl NameFieldResolver {
    pub const fn new(
        kind: &'static str,
        keys: &'static [&'static str],
        excluded: &'static [&'static str],
    ) -> Self {
        Self {
            kind,
            keys,
            excluded,
        }
    }
}

impl IdentityResolver for NameFieldResolver {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn logical_key(&self, resource: &Resource) -> Option<String> {
        self.keys.iter().find_map(|k| resource.get_str(k))
    }

    fn excluded_fields(&self) -> &'static [&'static str] {
        self.excluded
    }
}

pub const CLOUDWATCH: NameFieldResolver = NameFieldResolver::new(
    "cloudwatch",
    &["alarm_name", "log_group_name", "dashboard_name"],
    &[
        "arn",
        "alarm_arn",
        "log_group_arn",
        "dashboard_arn",
        "state_value",
        "state_reason",
        "state_reason_data",
        "state_updated_timestamp",
        "stored_bytes",
    ],
);

pub const SECRETS_MANAGER: NameFieldResolver = NameFieldResolver::new(
    "secretsmanager",
    &["name"],
    &[
        "arn",
        "version_ids_to_stages",
        "last_accessed_date",
        "last_changed_date",
        "last_rotated_date",
    ],
);

pub const LAMBDA: NameFieldResolver = NameFieldResolver::new(
    "lambda",
    &["function_name", "layer_name"],
    &[
        "arn",
        "function_arn",
        "layer_arn",
        "layer_version_arn",
        "code_sha256",
        "last_modified",
        "role",
    ],
);

pub const S3: NameFieldResolver =
    NameFieldResolver::new("s3", &["name"], &["arn", "owner_id", "owner_display_name"]);

pub const SQS: NameFieldResolver = NameFieldResolver::new(
    "sqs",
    &["queue_name"],
    &["arn", "queue_url", "queue_arn"],
);

pub const BEDROCK: NameFieldResolver = NameFieldResolver::new(
    "bedrock",
    &["model_id", "model_name", "provisioned_model_name"],
    &["arn", "model_arn", "provisioned_model_arn"],
);

/// Rules are scoped to their bus: `name@bus`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventBridgeResolver;

impl IdentityResolver for EventBridgeResolver {
    fn kind(&self) -> &'static str {
        "eventbridge"
    }

    fn logical_key(&self, resource: &Resource) -> Option<String> {
        let name = resource.get_str("name");
        if resource.has("event_bus_name")
            && let Some(name) = &name
        {
            let bus = resource
                .get_str("event_bus_name")
                .unwrap_or_else(|| "default".to_string());
            return Some(format!("{name}@{bus}"));
        }
        name.or_else(|| resource.get_str("archive_name"))
    }

    fn excluded_fields(&self) -> &'static [&'static str] {
        &["arn"]
    }
}

/// Environments are keyed `application/environment`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticBeanstalkResolver;

impl IdentityResolver for ElasticBeanstalkResolver {
    fn kind(&self) -> &'static str {
        "elasticbeanstalk"
    }

    fn logical_key(&self, resource: &Resource) -> Option<String> {
        let app = resource.get_str("application_name")?;
        match resource.get_str("environment_name") {
            Some(env) => Some(format!("{app}/{env}")),
            None => Some(app),
        }
    }

    fn excluded_fields(&self) -> &'static [&'static str] {
        &[
            "arn",
            "application_arn",
            "environment_arn",
            "environment_id",
            "endpoint_url",
            "cname",
        ]
    }
}

/// Topics by name; subscriptions by `topic:protocol:endpoint`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnsResolver;

impl IdentityResolver for SnsResolver {
    fn kind(&self) -> &'static str {
        "sns"
    }

    fn logical_key(&self, resource: &Resource) -> Option<String> {
        let topic = resource.get_str("topic_name")?;
        if !resource.has("subscription_arn") {
            return Some(topic);
        }
        let protocol = resource.get_str("protocol").unwrap_or_default();
        let endpoint = resource.get_str("endpoint").unwrap_or_default();
        Some(format!("{topic}:{protocol}:{endpoint}"))
    }

    fn excluded_fields(&self) -> &'static [&'static str] {
        &[
            "arn",
            "topic_arn",
            "subscription_arn",
            "owner",
            "subscriptions_confirmed",
            "subscriptions_pending",
            "subscriptions_deleted",
        ]
    }
}

/// Quotas by `service_code/quota_code`, with names when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceQuotasResolver;

impl IdentityResolver for ServiceQuotasResolver {
    fn kind(&self) -> &'static str {
        "service-quotas"
    }

    fn logical_key(&self, resource: &Resource) -> Option<String> {
        let service = resource.get_str("service_code")?;
        let quota = resource.get_str("quota_code")?;
        match (resource.get_str("service_name"), resource.get_str("quota_name")) {
            (Some(service_name), Some(quota_name)) => Some(format!(
                "{service}/{quota} ({service_name} - {quota_name})"
            )),
            _ => Some(format!("{service}/{quota}")),
        }
    }

    fn excluded_fields(&self) -> &'static [&'static str] {
        &["arn"]
    }
}

/// EC2 ids are per account; match on the `Name` tag or on shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ec2Resolver;

impl Ec2Resolver {
    fn prefix(resource: &Resource) -> &'static str {
        if resource.has("instance_id") {
            "instance"
        } else if resource.has("group_id") && resource.has("group_name") {
            "sg"
        } else if resource.has("subnet_id") {
            "subnet"
        } else if resource.has("vpc_id") && resource.has("cidr_block") {
            "vpc"
        } else if resource.has("route_table_id") {
            "rtb"
        } else if resource.has("network_acl_id") {
            "nacl"
        } else if resource.has("key_name") && resource.has("key_fingerprint") {
            "keypair"
        } else {
            "ec2"
        }
    }
}

impl IdentityResolver for Ec2Resolver {
    fn kind(&self) -> &'static str {
        "ec2"
    }

    fn logical_key(&self, resource: &Resource) -> Option<String> {
        if let Some(name) = resource.tag("Name") {
            return Some(format!("{}:{name}", Self::prefix(resource)));
        }

        if resource.has("instance_id") {
            let unknown = || "unknown".to_string();
            let instance_type = resource.get_str("instance_type").unwrap_or_else(unknown);
            let image = resource
                .get_str("ami_id")
                .or_else(|| resource.get_str("image_id"))
                .unwrap_or_else(unknown);
            return Some(format!("instance:{instance_type}/{image}"));
        }

        if resource.has("group_id")
            && let Some(group) = resource.get_str("group_name")
        {
            return Some(format!("sg:{group}"));
        }

        // Subnets carry a vpc_id too, so they are checked first.
        if resource.has("subnet_id")
            && let Some(cidr) = resource.get_str("cidr_block")
        {
            let az = resource
                .get_str("availability_zone")
                .unwrap_or_else(|| "unknown".to_string());
            return Some(format!("subnet:{cidr}@{az}"));
        }

        if resource.has("vpc_id")
            && let Some(cidr) = resource.get_str("cidr_block")
        {
            return Some(format!("vpc:{cidr}"));
        }

        if resource.has("key_fingerprint") {
            return resource.get_str("key_name").map(|k| format!("keypair:{k}"));
        }

        None
    }

    fn excluded_fields(&self) -> &'static [&'static str] {
        &[
            "arn",
            "owner_id",
            "instance_id",
            "vpc_id",
            "subnet_id",
            "group_id",
            "key_pair_id",
            "route_table_id",
            "network_acl_id",
            "security_groups",
            "private_ip_address",
            "public_ip_address",
            "private_dns_name",
            "public_dns_name",
            "launch_time",
            "available_ip_address_count",
        ]
    }
}

/// Resolver for a service, defaulting to the generic strategy.
pub fn resolver_for(service: &str) -> Arc<dyn IdentityResolver> {
    match service {
        "cloudwatch" => Arc::new(CLOUDWATCH),
        "eventbridge" => Arc::new(EventBridgeResolver),
        "secretsmanager" => Arc::new(SECRETS_MANAGER),
        "lambda" => Arc::new(LAMBDA),
        "s3" => Arc::new(S3),
        "ec2" => Arc::new(Ec2Resolver),
        "sqs" => Arc::new(SQS),
        "bedrock" => Arc::new(BEDROCK),
        "elasticbeanstalk" => Arc::new(ElasticBeanstalkResolver),
        "sns" => Arc::new(SnsResolver),
        "service-quotas" | "servicequotas" => Arc::new(ServiceQuotasResolver),
        _ => Arc::new(DefaultResolver),
    }
}
