//! HTTP Module
//!
//! This module exposes the [`PasteService`](crate::service::PasteService)
//! over HTTP with axum. Each request is handled on its own Tokio task by
//! hyper; storage work is pushed to the blocking pool.
//!
//! ## Routes
//!
//! ```text
//!   GET  /msg/{id}   ──>  200 {"expiration": "...", "text": "..."}
//!                          404 Text not found
//!   GET  /msg[/]     ──>  400 Missing field: id
//!   POST /msg[/]     ──>  200 <id>                    (form: text, expiration)
//!                          400 Missing field: text
//!                          400 Missing or invalid field: expiration
//!   GET  /*          ──>  static files (when a static directory is configured)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use textdrop::http::router;
//! use tokio::net::TcpListener;
//!
//! let app = router(service, None);
//! let listener = TcpListener::bind("127.0.0.1:5000").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod routes;

// Re-export commonly used items
pub use routes::{router, ApiError, SaveForm, TextResponse};
