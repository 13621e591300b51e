mod error;
pub use error::ApiError;

mod view;
pub use view::{ContainerView, StatusView};

mod handler;
pub use handler::StatusHandler;

mod adapter;
pub use adapter::RunStateAdapter;

mod render;
pub use render::render_index;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpApi;

#[cfg(feature = "http")]
mod server;

#[cfg(feature = "http")]
pub use server::{HttpStatusConfig, HttpStatusServer};

#[cfg(feature = "http")]
pub use axum;
