// Handlers behind `jwt_auth_middleware`
pub mod srag;
