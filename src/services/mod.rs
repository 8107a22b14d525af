pub mod auth_service;
pub use auth_service::{AuthError, AuthService, Registration};

pub mod auth_service_impl;
pub use auth_service_impl::SeaOrmAuthService;

pub mod message_service;
pub use message_service::{MessageError, MessageService};

pub mod message_service_impl;
pub use message_service_impl::SeaOrmMessageService;
