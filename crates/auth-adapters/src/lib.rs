//! # auth-adapters
//!
//! Identity provider integrations: the account directory used for receiver
//! resolution and sender display, and bearer-token verification.

#[cfg(feature = "auth-jwt")]
pub mod jwt;
pub mod static_directory;
pub mod supabase;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtVerifier;
pub use static_directory::StaticDirectory;
pub use supabase::SupabaseDirectory;
