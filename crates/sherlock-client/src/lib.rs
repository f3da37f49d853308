//! sherlock-client: REST client for the Sherlock edge-management backend.
//!
//! Wraps every `/v1` call in a single 401 recovery (refresh token, then
//! cached credentials) and keeps the session in a pluggable store.

pub mod auth;
pub mod client;
pub mod resources;
pub mod session;

pub use auth::{login_redirect, AuthOutcome, TokenResponse};
pub use client::{ApiClient, ErrorHook, REQUEST_ID_HEADER};
pub use resources::{CreateResponse, ProjectScoped, Resource, RESOURCE_NAMES};
pub use session::{
    Credentials, FileSessionStore, MemorySessionStore, Session, SessionKey, SessionStore,
};
