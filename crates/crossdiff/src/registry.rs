//! Service registry - which services can be compared and how

use crate::context::Fetcher;
use crate::identity::{IdentityResolver, resolver_for};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Descriptive metadata about a registered service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    pub description: String,
    pub resource_types: Vec<String>,
}

impl ServiceInfo {
    pub fn new(description: impl Into<String>, resource_types: &[&str]) -> Self {
        Self {
            description: description.into(),
            resource_types: resource_types.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// A registered service: fetcher, identity strategy and metadata.
pub struct ServiceEntry<S> {
    pub fetcher: Arc<dyn Fetcher<S>>,
    pub resolver: Arc<dyn IdentityResolver>,
    pub info: ServiceInfo,
}

impl<S> fmt::Debug for ServiceEntry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("resolver", &self.resolver)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

/// Explicitly constructed table of comparable services.
///
/// Generic over the session type handed to fetchers.
pub struct ServiceRegistry<S> {
    services: BTreeMap<String, ServiceEntry<S>>,
}

impl<S> Default for ServiceRegistry<S> {
    fn default() -> Self {
        Self {
            services: BTreeMap::new(),
        }
    }
}

impl<S> fmt::Debug for ServiceRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.services.iter()).finish()
    }
}

impl<S> ServiceRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service using its default identity strategy.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fetcher: Arc<dyn Fetcher<S>>,
        info: ServiceInfo,
    ) -> &mut Self {
        let name = name.into();
        let resolver = resolver_for(&name);
        self.register_with_resolver(name, fetcher, resolver, info)
    }

    /// Register a service with an explicit identity strategy.
    pub fn register_with_resolver(
        &mut self,
        name: impl Into<String>,
        fetcher: Arc<dyn Fetcher<S>>,
        resolver: Arc<dyn IdentityResolver>,
        info: ServiceInfo,
    ) -> &mut Self {
        let name = name.into();
        if self.services.contains_key(&name) {
            log::warn!("Service '{name}' registered twice, replacing the earlier entry");
        }
        log::debug!("Registered service {name} ({} identity)", resolver.kind());
        self.services.insert(
            name,
            ServiceEntry {
                fetcher,
                resolver,
                info,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&ServiceEntry<S>> {
        self.services.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Registered service names, sorted.
    pub fn list_services(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Metadata for every service, sorted by name.
    pub fn service_infos(&self) -> impl Iterator<Item = (&str, &ServiceInfo)> {
        self.services.iter().map(|(name, e)| (name.as_str(), &e.info))
    }

    /// Split requested names into registered and unknown ones.
    ///
    /// Duplicates are dropped; order of first appearance is kept.
    pub fn validate_services(&self, requested: &[String]) -> (Vec<String>, Vec<String>) {
        let mut valid: Vec<String> = Vec::new();
        let mut invalid: Vec<String> = Vec::new();
        for name in requested {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let bucket = if self.is_registered(name) {
                &mut valid
            } else {
                &mut invalid
            };
            if !bucket.iter().any(|n| n == name) {
                bucket.push(name.to_string());
            }
        }
        (valid, invalid)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::identity::DefaultResolver;
    use crate::resource::ResourceMap;

    fn noop() -> Arc<dyn Fetcher<()>> {
        Arc::new(|_: &str, _: &(), _: &str| -> Result<ResourceMap> { Ok(ResourceMap::new()) })
    }

    #[test]
    fn test_register_and_list() {
        let mut registry = ServiceRegistry::new();
        registry
            .register("sqs", noop(), ServiceInfo::new("Queues", &["queues"]))
            .register("ec2", noop(), ServiceInfo::default());

        assert_eq!(registry.list_services(), vec!["ec2", "sqs"]);
        assert!(registry.is_registered("sqs"));
        assert!(!registry.is_registered("rds"));
        assert_eq!(registry.get("ec2").unwrap().resolver.kind(), "ec2");
        assert_eq!(registry.get("sqs").unwrap().info.resource_types, vec!["queues"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_explicit_resolver() {
        let mut registry = ServiceRegistry::new();
        registry.register_with_resolver(
            "ec2",
            noop(),
            Arc::new(DefaultResolver),
            ServiceInfo::default(),
        );
        assert_eq!(registry.get("ec2").unwrap().resolver.kind(), "default");
    }

    #[test]
    fn test_validate_services() {
        let mut registry = ServiceRegistry::new();
        registry.register("s3", noop(), ServiceInfo::default());
        registry.register("sns", noop(), ServiceInfo::default());

        let requested: Vec<String> = ["s3", " sns ", "rds", "s3", ""]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let (valid, invalid) = registry.validate_services(&requested);
        assert_eq!(valid, vec!["s3", "sns"]);
        assert_eq!(invalid, vec!["rds"]);
    }
}
