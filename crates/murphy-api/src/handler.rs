use async_trait::async_trait;

use murphy_model::ContainerId;

use crate::{
    error::ApiError,
    view::{ContainerView, StatusView},
};

/// Read side of the status endpoint.
///
/// Implementations must return a consistent view even while allocation events are being
/// processed.
#[async_trait]
pub trait StatusHandler: Send + Sync + 'static {
    async fn status(&self) -> Result<StatusView, ApiError>;

    /// A running container, or `None` if it is unknown or already completed.
    async fn container(&self, id: &ContainerId) -> Result<Option<ContainerView>, ApiError>;
}
