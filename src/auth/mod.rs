//! Account registration and the signed-in session.
//!
//! Provides:
//! - A ledger of registered accounts keyed by email (last registration wins)
//! - One current session per storage profile, persisted across restarts
//! - Argon2id-hashed secrets with per-account salts
//! - A transport seam with timeout + cancellation where a remote auth
//!   service would plug in
//! - Role-based route gating for the UI layer
//!
//! ## Design Decisions
//! - The store is an explicit object the UI layer holds; there is no global
//!   session state.
//! - Overlapping register/authenticate calls fail with `Busy` rather than
//!   racing on the ledger.
//! - Malformed persisted data is treated as absent, never as an error.

pub mod credentials;
pub mod error;
pub mod gate;
pub mod storage;
pub mod store;
pub mod transport;
pub mod types;

pub use error::AuthError;
pub use gate::{check_access, check_action, nav_links, Access, Action, NavLink, Route};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::SessionStore;
pub use transport::{AuthRequest, AuthTransport, SimulatedTransport};
pub use types::{Account, AccountId, PublicAccount, Role};
