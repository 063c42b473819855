//! Vitrine — storefront mobile client core.
//!
//! The engine room of a mobile storefront app: session lifecycle
//! (token persistence, single-flight refresh, an auth-aware API gateway),
//! and a small workflow engine driving guided multi-step flows such as
//! seller onboarding. Screens and domain REST wrappers live above this
//! crate and talk to the backend exclusively through the gateway.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitrine::auth::{ApiRequest, AuthStack, FileTokenStore};
//! use vitrine::config::ApiConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig::from_env()?;
//! let stack = AuthStack::new(config, Arc::new(FileTokenStore::new_default()));
//!
//! let check = stack.session.check_auth().await;
//! if check.is_authenticated() {
//!     let response = stack.gateway.send(ApiRequest::get("/orders")).await?;
//!     println!("orders: {}", response.status());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;
pub mod workflow;
