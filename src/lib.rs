//! Client-side domain layer for the IssueHub issue tracker: a typed HTTP
//! client with bearer-credential handling, a durable session store,
//! role-derived authorization helpers, a filtered/paginated issue query
//! engine, and a self-expiring notification queue.

pub mod api;
pub mod auth;
pub mod models;
pub mod notify;
pub mod query;
pub mod session;
pub mod test_support;
