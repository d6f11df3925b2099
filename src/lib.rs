//! Session and credential core for the impactdesk role dashboards
//! (NGO, donor, auditor).

pub mod auth;
pub mod config;

pub use auth::{AuthError, PublicAccount, Role, SessionStore};
pub use config::Config;

use std::sync::Arc;

/// Open the file-backed session store described by `config`, with the
/// simulated transport, and restore any persisted session.
pub fn open_store(config: &Config) -> anyhow::Result<SessionStore> {
    let data_dir = config.data_dir()?;
    let storage = Arc::new(auth::FileStore::new(&data_dir)?);
    let transport = Arc::new(auth::SimulatedTransport::new(
        config.auth.simulated_latency(),
    ));
    tracing::debug!(data_dir = %data_dir.display(), "Opening session store");
    SessionStore::open(storage, transport, config.auth.clone(), &config.kdf)
}
