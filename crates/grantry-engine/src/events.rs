//! Grant change event bus

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use grantry_core::{PermissionChangeKind, PermissionChangedEvent, PermissionEventHandler, Result};

/// How handlers are invoked on publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Handlers run before `publish` returns and their errors reach the caller
    #[default]
    Sync,
    /// Handlers run on a spawned task; errors are only logged
    Background,
}

/// Routes grant change events to subscribed handlers
///
/// Subscriptions are made while composing the application; the bus is then
/// shared behind an `Arc`.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<PermissionChangeKind, Vec<Arc<dyn PermissionEventHandler>>>,
    mode: DispatchMode,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn subscribe(&mut self, kind: PermissionChangeKind, handler: Arc<dyn PermissionEventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Subscribe one handler to every change kind
    pub fn subscribe_all(&mut self, handler: Arc<dyn PermissionEventHandler>) {
        for kind in PermissionChangeKind::ALL {
            self.subscribe(kind, handler.clone());
        }
    }

    pub fn handler_count(&self, kind: PermissionChangeKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler subscribed to its kind
    ///
    /// Every handler runs even if an earlier one fails; the first failure is
    /// returned.
    pub async fn publish(&self, event: PermissionChangedEvent) -> Result<()> {
        let handlers = match self.handlers.get(&event.kind) {
            Some(handlers) if !handlers.is_empty() => handlers.clone(),
            _ => return Ok(()),
        };

        match self.mode {
            DispatchMode::Sync => dispatch(&handlers, &event).await,
            DispatchMode::Background => {
                tokio::spawn(async move {
                    if let Err(e) = dispatch(&handlers, &event).await {
                        warn!(kind = %event.kind, permission = %event.name, error = %e, "Background event dispatch failed");
                    }
                });
                Ok(())
            }
        }
    }
}

async fn dispatch(
    handlers: &[Arc<dyn PermissionEventHandler>],
    event: &PermissionChangedEvent,
) -> Result<()> {
    let mut first_error = None;
    for handler in handlers {
        if let Err(e) = handler.handle(event).await {
            warn!(handler = handler.name(), kind = %event.kind, error = %e, "Event handler failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Writes every grant change to the audit log target
#[derive(Debug, Clone, Default)]
pub struct AuditLogHandler;

#[async_trait]
impl PermissionEventHandler for AuditLogHandler {
    fn name(&self) -> &str {
        "audit_log"
    }

    async fn handle(&self, event: &PermissionChangedEvent) -> Result<()> {
        info!(
            target: "grantry::audit",
            kind = %event.kind,
            permission = %event.name,
            provider_kind = %event.provider_kind,
            provider_key = %event.provider_key,
            tenant = ?event.tenant_id,
            occurred_at = %event.occurred_at,
            "Permission grant changed"
        );
        Ok(())
    }
}
