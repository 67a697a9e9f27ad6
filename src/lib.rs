//! # Scoutline (Identity & Session Service)
//!
//! `scoutline` is the identity core of the Scoutline player-recruitment
//! marketplace. It owns account credentials, one-time login codes, and the
//! session tokens the rest of the platform trusts.
//!
//! ## Authentication
//!
//! Two credential paths converge on one session format:
//!
//! - **One-time codes (OTC):** a 6-digit code is emailed to prove control of
//!   an address. Codes are purpose-bound (`login`, `signup`,
//!   `password_reset`), expire after 10 minutes, and are consumed exactly
//!   once via an atomic conditional update.
//! - **Passwords:** argon2id hashes stored per account. Accounts created
//!   through the OTC path may never have one.
//!
//! ## Sessions
//!
//! Sessions are stateless: an HS256-signed token carries the user's
//! identity, role, and verification flag, and is validated on every request
//! without a database round trip. The trade-off is deliberate and
//! documented: there is no server-side revocation list, so a session stays
//! valid until its 30-day expiry and claim changes only take effect when a
//! token is reissued.
//!
//! ## Error surface
//!
//! Every operation answers with a uniform envelope
//! (`success`/`message`/`error`/`user`); failures never cross the HTTP
//! boundary as faults. Code verification failures are intentionally
//! undifferentiated so callers cannot probe which dimension was wrong.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
