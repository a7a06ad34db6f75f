//! Selector Context
//!
//! This crate provides fine-grained subscriptions to shared values inside a
//! tree of rendering components. It implements:
//!
//! - Selector contexts: consumers subscribe to a projection of a shared value
//!   and re-render only when that projection changes
//! - Immutability markers: memoized subtrees that still follow the re-renders
//!   of one designated root
//! - A small synchronous host engine that both are built on
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `host`: components, elements, hooks, ambient channels and the renderer
//! - `selector`: the selector context provider and consumer hooks
//! - `immutable`: the root/response marker pair
//! - `config` and `error`: renderer configuration and error types
//!
//! # Example
//!
//! ```rust,ignore
//! use selector_context::host::{Component, Renderer};
//! use selector_context::{create_context, use_context_keys};
//!
//! let user = create_context::<User>(None);
//!
//! let name = {
//!     let user = user.clone();
//!     Component::new("Name", move |cx, _props: &()| {
//!         // Re-renders only when `name` changes, not when `age` does
//!         let name = use_context_keys(cx, &user, "name");
//!         Vec::new()
//!     })
//! };
//!
//! let renderer = Renderer::new();
//! renderer.render(user.provide(current_user, vec![name.element(())]))?;
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod immutable;
pub mod selector;

pub use config::EngineConfig;
pub use error::{HostError, Result};
pub use immutable::{
    create_immutable, default_immutable, make_root, make_root_with, respond_to_root,
    respond_to_root_with, use_immutable_mark, CompareProps, Immutable,
};
pub use selector::{
    create_context, use_context, use_context_keys, use_context_selector, use_holder,
    KeySelector, ProviderProps, SelectorContext, SharedValueHolder, Trigger,
};
