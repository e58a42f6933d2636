//! Client core for construction project management: a command gateway to the
//! backend, typed entity services, reducer-backed state containers and a live
//! notification feed.

pub mod config;
pub mod desk;
pub mod gateway;
pub mod models;
pub mod notifications;
pub mod services;
pub mod session;
pub mod store;

pub use desk::SiteDesk;
