/// Decides which namespace a request is served from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamespacePolicy {
    default: String,
    reserved: String,
}

/// A request targeted the reserved namespace.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unable to list within the {0} namespace")]
pub struct Unauthorized(pub String);

// === impl NamespacePolicy ===

impl NamespacePolicy {
    pub fn new(default: impl Into<String>, reserved: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            reserved: reserved.into(),
        }
    }

    pub fn default_namespace(&self) -> &str {
        &self.default
    }

    /// Returns the namespace to look up, falling back to the default namespace
    /// when none (or an empty one) is requested.
    pub fn lookup<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, Unauthorized> {
        let ns = requested
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.default);
        self.check(ns)?;
        Ok(ns)
    }

    pub fn check(&self, ns: &str) -> Result<(), Unauthorized> {
        if ns == self.reserved {
            return Err(Unauthorized(ns.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_defaults_namespace() {
        let policy = NamespacePolicy::new("openfaas-fn", "kube-system");
        assert_eq!(policy.lookup(None), Ok("openfaas-fn"));
        assert_eq!(policy.lookup(Some("")), Ok("openfaas-fn"));
        assert_eq!(policy.lookup(Some("staging-fn")), Ok("staging-fn"));
    }

    #[test]
    fn lookup_rejects_reserved_namespace() {
        let policy = NamespacePolicy::new("openfaas-fn", "kube-system");
        assert_eq!(
            policy.lookup(Some("kube-system")),
            Err(Unauthorized("kube-system".to_string()))
        );

        // The reserved namespace is rejected even when it is the default.
        let policy = NamespacePolicy::new("kube-system", "kube-system");
        assert!(policy.lookup(None).is_err());
    }
}
