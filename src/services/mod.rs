// services/mod.rs - Per-entity business logic between handlers and the store
//
// Handlers stay thin: extract the session and inputs, call one service
// method, wrap the result. Every service authorizes through `policy`.

pub mod client_service;
pub mod job_card_service;
pub mod public_service;
pub mod resource_service;
pub mod settings_service;
pub mod technician_service;
pub mod ticket_service;
pub mod user_service;

pub use client_service::ClientService;
pub use job_card_service::JobCardService;
pub use public_service::PublicService;
pub use resource_service::{ListParams, ResourceService, Scope};
pub use settings_service::SettingsService;
pub use technician_service::TechnicianService;
pub use ticket_service::{TicketService, TicketView};
pub use user_service::UserService;
