//! `VirtualClusterSpec`: the equality/propagation configuration consumed by
//! the syncer's `CheckEquality` rules (spec.md §4.4, §6).

#[derive(Debug, Clone, Default)]
pub struct VirtualClusterSpec {
    /// Annotation/label prefixes propagated both ways and never filtered.
    pub transparent_meta_prefixes: Vec<String>,
    /// Prefixes ignored on both sides (tenant may not use them).
    pub opaque_meta_prefixes: Vec<String>,
    /// Tenant-owned prefixes that must not be clobbered even if also listed
    /// as opaque.
    pub protected_meta_prefixes: Vec<String>,
    /// Domain suffixes in the key prefix treated as opaque, e.g.
    /// `tenancy.x-k8s.io`.
    pub default_opaque_meta_domains: Vec<String>,
    /// DNS cluster-domain used when mutating pod `DNSConfig`.
    pub cluster_domain: String,
    /// Cluster IP of the tenant cluster's DNS service, used both for the
    /// `HostAlias` rewrite and as the nameserver in a rewritten `DNSConfig`
    /// (spec.md §6).
    pub cluster_dns_ip: String,
}

impl VirtualClusterSpec {
    pub fn is_transparent(&self, key: &str) -> bool {
        self.transparent_meta_prefixes
            .iter()
            .any(|p| key.starts_with(p.as_str()))
    }

    pub fn is_opaque(&self, key: &str) -> bool {
        if self.protected_meta_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
            return false;
        }
        self.opaque_meta_prefixes.iter().any(|p| key.starts_with(p.as_str()))
            || self
                .default_opaque_meta_domains
                .iter()
                .any(|domain| key.split('/').next().map(|ns| ns.ends_with(domain.as_str())).unwrap_or(false))
    }
}
