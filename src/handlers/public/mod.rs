// handlers/public/mod.rs - Public handlers (no session)
//
// Login issues the JWT used by the protected tier. The portal handlers
// authenticate by the access token or unique id in their path instead.

pub mod auth;
pub mod portal;
