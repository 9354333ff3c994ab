//! Headless client for the directory: view state, reducer, search debounce,
//! and a controller that runs the reducer's commands against a
//! [`api::DirectoryApi`].

pub mod api;
pub mod controller;
pub mod debounce;
pub mod state;

pub use api::{DirectoryApi, HttpDirectory, LocalDirectory, RemoteError};
pub use controller::{spawn, ControllerConfig, DirectoryHandle};
pub use state::{reduce, Action, UiEvent, ViewState};
