use async_trait::async_trait;

use murphy_core::RunState;
use murphy_model::ContainerId;

use crate::{
    error::ApiError,
    handler::StatusHandler,
    view::{ContainerView, StatusView},
};

/// [`StatusHandler`] over the orchestrator's shared run state.
pub struct RunStateAdapter {
    state: RunState,
}

impl RunStateAdapter {
    pub fn new(state: RunState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl StatusHandler for RunStateAdapter {
    async fn status(&self) -> Result<StatusView, ApiError> {
        Ok(StatusView::from(&self.state.snapshot()))
    }

    async fn container(&self, id: &ContainerId) -> Result<Option<ContainerView>, ApiError> {
        Ok(self.state.get(id).map(|task| ContainerView::new(id, &task)))
    }
}
