// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route prefix: /api/*. Every handler takes `Session` first, so requests
// without a valid bearer token are rejected with 401 before the body runs.

pub mod auth;
pub mod client_children;
pub mod clients;
pub mod job_cards;
pub mod resources;
pub mod settings;
pub mod support_tickets;
pub mod technicians;
pub mod users;
