use std::{fmt, net::SocketAddr};

/// Names a function within a namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub namespace: String,
    pub name: String,
}

/// The address of one ready function instance. Only valid for the request
/// that resolved it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAddress(SocketAddr);

/// No ready instance of the function could be found.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("No endpoints available for: {0}.")]
pub struct NoEndpoints(pub FunctionRef);

// === impl FunctionRef ===

impl FunctionRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parses a function name that may be qualified as `name.namespace`.
    ///
    /// Unqualified names are placed in `namespace`.
    pub fn parse(name: &str, namespace: &str) -> Self {
        match name.rsplit_once('.') {
            Some((name, ns)) if !name.is_empty() && !ns.is_empty() => Self::new(ns, name),
            _ => Self::new(namespace, name),
        }
    }
}

impl fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.namespace)
    }
}

// === impl ResolvedAddress ===

impl ResolvedAddress {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.0
    }

    /// Builds a URI for `path_and_query` on this instance.
    pub fn uri(&self, path_and_query: &str) -> Result<http::Uri, http::uri::InvalidUri> {
        format!("http://{}{}", self.0, path_and_query).parse()
    }
}

impl From<SocketAddr> for ResolvedAddress {
    fn from(addr: SocketAddr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
