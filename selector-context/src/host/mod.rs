//! Host Engine
//!
//! A small synchronous component runtime. It supplies what the selector
//! context and the immutability marker build on: components and elements,
//! order-based hooks, layout effects, ambient channels and batched updates.
//!
//! # Overview
//!
//! - A [`Component`] renders its props into child [`Element`]s.
//! - A [`Renderer`] owns the mounted instance tree and runs render passes.
//! - Hooks on [`RenderContext`] keep per-instance state between renders.
//! - An [`AmbientChannel`] carries a value down the tree without props.
//!
//! # Design Decisions
//!
//! 1. Element identity is the address of its shared allocation. Passing an
//!    element through unchanged is how a parent tells the renderer a subtree
//!    needs no work.
//!
//! 2. Every pass walks the whole mounted tree. Bailed-out instances are cheap
//!    to visit, and the walk is what lets dirty or ambient-dependent
//!    descendants render below a memo boundary.
//!
//! 3. All updates go through one scheduler queue. Requests made while a pass
//!    is running or a batch is open are coalesced into the next pass.

mod effect;
mod element;
mod event;
mod hooks;
mod id;
mod instance;
mod renderer;
mod scheduler;
mod scope;

pub use effect::Cleanup;
pub use element::{Component, Element, Handle, Props};
pub use event::StableFn;
pub use hooks::{ByAddress, ForceUpdate, RenderContext, Setter, Slot};
pub use id::{ChannelId, ComponentId, InstanceId, ListenerId};
pub use renderer::Renderer;
pub use scheduler::Batcher;
pub use scope::AmbientChannel;
