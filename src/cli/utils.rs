use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::cli::OutputFormat;
use crate::config;
use crate::database::{DatabaseManager, PgSragStore, SragStore};

/// Output a success message in the appropriate format.
/// `data` fields are merged into the JSON object when it is an object.
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert("success".into(), json!(true));
            response.insert("message".into(), json!(message));

            match data {
                Some(Value::Object(fields)) => response.extend(fields),
                Some(other) => {
                    response.insert("data".into(), other);
                }
                None => {}
            }

            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Connect to the configured database and make sure the table exists
pub async fn connect_store() -> anyhow::Result<Arc<dyn SragStore>> {
    let pool = DatabaseManager::connect(&config::config().database).await?;
    let store = PgSragStore::new(pool);
    store.ensure_schema().await?;
    Ok(Arc::new(store))
}
