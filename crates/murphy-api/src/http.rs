use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Html,
    routing::get,
};
use tracing::debug;

use murphy_model::ContainerId;

use crate::{
    error::ApiError,
    handler::StatusHandler,
    render::render_index,
    view::{ContainerView, StatusView},
};

/// HTTP status API builder.
pub struct HttpApi<H> {
    handler: Arc<H>,
    prefix: String,
}

impl<H> HttpApi<H>
where
    H: StatusHandler,
{
    /// Routes are mounted under `prefix` (e.g. `/murphy`); an empty prefix mounts at the root.
    pub fn new(handler: Arc<H>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into().trim_end_matches('/').to_string();
        Self { handler, prefix }
    }

    /// Build axum router with mounted endpoints.
    ///
    /// Routes:
    /// - GET {prefix}/index - HTML overview
    /// - GET {prefix}/api/v1/status - Counters and running containers
    /// - GET {prefix}/api/v1/containers/{id} - One running container
    pub fn router(self) -> Router {
        let prefix = self.prefix;
        Router::new()
            .route(&format!("{prefix}/index"), get(index::<H>))
            .route(&format!("{prefix}/api/v1/status"), get(status::<H>))
            .route(
                &format!("{prefix}/api/v1/containers/{{id}}"),
                get(container::<H>),
            )
            .with_state(self.handler)
    }
}

/// GET {prefix}/index
async fn index<H>(State(handler): State<Arc<H>>) -> Result<Html<String>, ApiError>
where
    H: StatusHandler,
{
    let view = handler.status().await?;
    Ok(Html(render_index(&view)))
}

/// GET {prefix}/api/v1/status
async fn status<H>(State(handler): State<Arc<H>>) -> Result<Json<StatusView>, ApiError>
where
    H: StatusHandler,
{
    Ok(Json(handler.status().await?))
}

/// GET {prefix}/api/v1/containers/{id}
async fn container<H>(
    State(handler): State<Arc<H>>,
    Path(id): Path<String>,
) -> Result<Json<ContainerView>, ApiError>
where
    H: StatusHandler,
{
    let container_id: ContainerId = id
        .parse()
        .map_err(|_| ApiError::InvalidRequest(format!("malformed container id: {id}")))?;
    debug!(container = %container_id, "container status requested");

    handler
        .container(&container_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::ContainerNotFound(container_id.to_string()))
}

#[cfg(test)]
mod tests {
    use murphy_core::RunState;
    use murphy_model::{Resource, TaskDescriptor};

    use super::*;
    use crate::adapter::RunStateAdapter;

    fn handler() -> Arc<RunStateAdapter> {
        let state = RunState::new();
        state.set_requested(2);
        let task = TaskDescriptor::new(
            Resource::new(768, 2).unwrap(),
            1,
            vec!["work".into()],
        )
        .unwrap();
        state.assign(ContainerId::new(7), task).unwrap();
        Arc::new(RunStateAdapter::new(state))
    }

    #[tokio::test]
    async fn status_lists_running_containers() {
        let Json(view) = status(State(handler())).await.unwrap();
        assert_eq!(view.requested, 2);
        assert_eq!(view.containers.len(), 1);
        assert_eq!(view.containers[0].vcores, 2);
    }

    #[tokio::test]
    async fn container_lookup() {
        let Json(found) = container(State(handler()), Path("container_000007".into()))
            .await
            .unwrap();
        assert_eq!(found.memory_mb, 768);

        let missing = container(State(handler()), Path("8".into())).await;
        assert!(matches!(missing, Err(ApiError::ContainerNotFound(_))));

        let malformed = container(State(handler()), Path("abc".into())).await;
        assert!(matches!(malformed, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn index_renders_html() {
        let Html(page) = index(State(handler())).await.unwrap();
        assert!(page.contains("container_000007"));
    }

    #[test]
    fn prefix_trailing_slash_is_ignored() {
        let api = HttpApi::new(handler(), "/murphy/");
        assert_eq!(api.prefix, "/murphy");
    }
}
