use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config;

/// `srag token <subject> [--hours N]`
pub fn handle(subject: String, hours: Option<u64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config::config().security;
    let claims = Claims::new(subject, hours.unwrap_or(security.jwt_expiry_hours));
    let token = generate_jwt(&claims, &security.jwt_secret)?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            &format!("Token issued for {}", claims.sub),
            Some(json!({ "token": token, "expires_at": claims.exp })),
        ),
        // bare token so it can be captured with $(srag token ...)
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
