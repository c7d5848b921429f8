// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Embedded-wallet JWT authentication for write endpoints.
//!
//! ## Auth Flow
//!
//! 1. The dashboard logs the user in through the embedded-wallet provider
//! 2. It sends `Authorization: Bearer <access token>`
//! 3. The server:
//!    - Fetches the app's P-256 signing keys via HTTPS
//!    - Verifies the ES256 signature, expiry, issuer (`privy.io`) and audience (app id)
//!    - Extracts `sub` as the user DID
//!
//! Read endpoints are public. Without `PRIVY_APP_ID` the server runs in
//! development mode: tokens are decoded but signatures are not checked.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::{privy_jwks_url, PrivyKeySet};
