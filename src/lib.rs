//! User directory service: a paginated, searchable list of user records with
//! create and delete, served over a small JSON API, plus the headless client
//! state machine that drives it.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod presentation;
pub mod state;
pub mod users;
