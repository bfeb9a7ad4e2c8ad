// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared collaborators every [`super::Agent`] draws on. Cloned cheaply
//! (all fields are `Arc`) and handed to each agent by the AgentSystem.

use std::sync::Arc;

use crate::connector::ConnectorRegistry;
use crate::event_bus::EventBus;
use crate::inference::InferenceRouter;
use crate::store::SessionStore;
use crate::tools::ToolResolver;

#[derive(Clone)]
pub struct AgentDeps {
    pub store: Arc<SessionStore>,
    pub event_bus: Arc<EventBus>,
    pub connectors: Arc<ConnectorRegistry>,
    pub inference: Arc<InferenceRouter>,
    pub tools: Arc<ToolResolver>,
}
