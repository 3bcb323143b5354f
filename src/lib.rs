//! # Federa (read-only user federation)
//!
//! `federa` exposes accounts from a legacy relational database to an
//! identity-management host. The host looks users up by username, email or
//! storage id and asks whether a password is valid; nothing is ever written
//! back.
//!
//! ## Passwords
//!
//! Stored hashes come in two formats: a structured
//! `PBKDF2$sha256$<iterations>$<salt>$<key>` string and a bare 40-character
//! SHA-1 hex digest. Both are verified in constant time. Malformed hashes fail
//! closed.
//!
//! ## Transactions
//!
//! Every request is one authentication transaction with its own
//! [`directory::DirectoryCache`] and pooled connection. Accounts resolved in
//! that transaction are reused for the credential check; nothing is cached
//! across requests.

pub mod api;
pub mod cli;
pub mod directory;
pub mod password;
pub mod pool;
pub mod provider;
pub mod vault;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
