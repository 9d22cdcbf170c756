use sqlx::SqlitePool;
use std::path::Path;

use crate::services::catalog::{
    import_catalog, validate_catalog, CatalogDocument, CatalogSnapshot, ImportSummary,
    ValidationReport,
};
use crate::services::identity::load_identity_map;
use crate::types::errors::{CommandError, CommandResult};

pub async fn validate_catalog_cmd(pool: &SqlitePool) -> CommandResult<ValidationReport> {
    let map = load_identity_map(pool).await?;
    let snapshot = CatalogSnapshot::load(pool).await?;
    Ok(validate_catalog(&map, &snapshot))
}

pub async fn import_catalog_cmd(pool: &SqlitePool, path: &Path) -> CommandResult<ImportSummary> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CommandError::NotFound(format!("Catalog file {}", path.display()))
        } else {
            CommandError::Io(format!("{}: {e}", path.display()))
        }
    })?;
    let document: CatalogDocument = serde_json::from_str(&raw)?;
    Ok(import_catalog(pool, &document).await?)
}
