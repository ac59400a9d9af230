use async_trait::async_trait;

/// Decision of a [`PushAuthorizer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Authorization {
    Allow,
    Deny { reason: String },
}

/// Decides whether a peer may push into a namespace.
///
/// Supplied by the hosting node; evaluated once per exchange, before any
/// payload is read.
#[async_trait]
pub trait PushAuthorizer: Send + Sync {
    async fn authorize(&self, requester: &str, namespace: &str) -> Authorization;
}

/// Accepts every push.
pub struct AllowAll;

#[async_trait]
impl PushAuthorizer for AllowAll {
    async fn authorize(&self, _requester: &str, _namespace: &str) -> Authorization {
        Authorization::Allow
    }
}

/// Accepts pushes into namespaces under a configured set of prefixes.
///
/// A prefix `scratch` admits `scratch` itself and every `scratch.*`
/// namespace below it. `*` admits everything.
#[derive(Clone, Debug, Default)]
pub struct NamespaceAllowList {
    prefixes: Vec<String>,
}

impl NamespaceAllowList {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, namespace: &str) -> bool {
        self.prefixes.iter().any(|p| {
            p == "*"
                || namespace == p
                || namespace
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

#[async_trait]
impl PushAuthorizer for NamespaceAllowList {
    async fn authorize(&self, requester: &str, namespace: &str) -> Authorization {
        if self.allows(namespace) {
            Authorization::Allow
        } else {
            tracing::info!(requester, namespace, "push denied by namespace allowlist");
            Authorization::Deny {
                reason: "not authorized".into(),
            }
        }
    }
}
