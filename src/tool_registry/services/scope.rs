//! Scoped-resource stack releasing started servers in reverse order.

use crate::tool_registry::{
    domain::{ReleaseTicket, ScopeId},
    ports::{ReleasableResource, ToolServerHostError, ToolServerHostResult},
};
use async_trait::async_trait;
use std::fmt;

struct ScopeEntry {
    label: String,
    resource: Option<Box<dyn ReleasableResource>>,
}

/// Owner of release capabilities for one session or consumer.
///
/// Resources are released in reverse order of entry, each at most once.
/// Dropping a scope that still holds resources schedules their release on
/// the current tokio runtime. Outside a runtime nothing can drive the
/// releases: they are logged and leaked, so such callers must close the
/// scope explicitly.
pub struct CleanupScope {
    id: ScopeId,
    entries: Vec<ScopeEntry>,
}

/// A release that failed while closing a scope.
#[derive(Debug, Clone)]
pub struct ReleaseFailure {
    /// Label the resource was entered with.
    pub label: String,
    /// Error returned by the resource.
    pub error: ToolServerHostError,
}

/// Outcome of closing a scope.
#[derive(Debug, Clone, Default)]
pub struct ScopeCloseReport {
    /// Labels of released resources, in release order.
    pub released: Vec<String>,
    /// Releases that returned an error.
    pub failures: Vec<ReleaseFailure>,
}

impl ScopeCloseReport {
    /// Returns whether every release succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl CleanupScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: ScopeId::new(),
            entries: Vec::new(),
        }
    }

    /// Returns the scope identifier.
    #[must_use]
    pub const fn id(&self) -> ScopeId {
        self.id
    }

    /// Takes ownership of `resource` and returns a non-owning ticket for it.
    pub fn enter(
        &mut self,
        label: impl Into<String>,
        resource: Box<dyn ReleasableResource>,
    ) -> ReleaseTicket {
        let ticket = ReleaseTicket::new(self.id, self.entries.len());
        self.entries.push(ScopeEntry {
            label: label.into(),
            resource: Some(resource),
        });
        ticket
    }

    /// Returns whether the resource behind `ticket` is still held.
    #[must_use]
    pub fn is_live(&self, ticket: ReleaseTicket) -> bool {
        ticket.scope() == self.id
            && self
                .entries
                .get(ticket.slot())
                .is_some_and(|entry| entry.resource.is_some())
    }

    /// Returns the number of resources not yet released.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.resource.is_some())
            .count()
    }

    /// Releases every held resource, newest first.
    ///
    /// Failures are collected rather than short-circuiting, so one failing
    /// release never leaks the resources entered before it. Closing twice
    /// releases nothing the second time.
    pub async fn close(&mut self) -> ScopeCloseReport {
        let mut report = ScopeCloseReport::default();
        for entry in self.entries.iter_mut().rev() {
            let Some(mut resource) = entry.resource.take() else {
                continue;
            };
            match resource.release().await {
                Ok(()) => {
                    tracing::debug!(scope = %self.id, resource = %entry.label, "released");
                    report.released.push(entry.label.clone());
                }
                Err(error) => {
                    tracing::warn!(
                        scope = %self.id,
                        resource = %entry.label,
                        error = %error,
                        "release failed"
                    );
                    report.failures.push(ReleaseFailure {
                        label: entry.label.clone(),
                        error,
                    });
                }
            }
        }
        report
    }
}

impl Default for CleanupScope {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CleanupScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CleanupScope")
            .field("id", &self.id)
            .field("entries", &self.entries.len())
            .field("pending", &self.pending())
            .finish()
    }
}

#[async_trait]
impl ReleasableResource for CleanupScope {
    async fn release(&mut self) -> ToolServerHostResult<()> {
        let report = self.close().await;
        report
            .failures
            .into_iter()
            .next()
            .map_or(Ok(()), |failure| Err(failure.error))
    }
}

impl Drop for CleanupScope {
    fn drop(&mut self) {
        let mut remaining: Vec<(String, Box<dyn ReleasableResource>)> = self
            .entries
            .iter_mut()
            .filter_map(|entry| {
                entry
                    .resource
                    .take()
                    .map(|resource| (entry.label.clone(), resource))
            })
            .collect();
        if remaining.is_empty() {
            return;
        }

        let scope = self.id;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                scope = %scope,
                pending = remaining.len(),
                "cleanup scope dropped outside a runtime; resources were not released"
            );
            return;
        };

        tracing::debug!(scope = %scope, pending = remaining.len(), "scheduling release on drop");
        runtime.spawn(async move {
            while let Some((label, mut resource)) = remaining.pop() {
                if let Err(error) = resource.release().await {
                    tracing::warn!(
                        scope = %scope,
                        resource = %label,
                        error = %error,
                        "release after drop failed"
                    );
                }
            }
        });
    }
}
