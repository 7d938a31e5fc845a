use serde_json::json;

use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::database::{SragQuery, SragStore};

/// `srag count`
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let store = connect_store().await?;
    let count = store.count(&SragQuery::all()).await?;
    output_success(output_format, &format!("{} records stored", count), Some(json!({ "count": count })))
}
