//! Web app for browsing and editing the practice's records
//!
//! This module serves server-rendered HTML pages, one per navigation entry,
//! plus form actions, XLSX/PDF downloads and a small JSON API. All requests
//! share one [`Session`](crate::session::Session) behind a mutex.

mod forms;
mod html;
mod pages;
mod server;
mod theme;

pub use server::{AppState, DEFAULT_PORT, router, start_server};
