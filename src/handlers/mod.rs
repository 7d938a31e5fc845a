// Public (no auth) and protected (bearer JWT) handlers
pub mod protected;
pub mod public;
