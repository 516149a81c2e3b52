#![allow(dead_code)]

pub mod fake_provider;
pub mod scripted_ui;

use std::sync::Arc;

use canopy_sqlite_backend::{SqliteState, StateStore};

pub async fn memory_store() -> Arc<dyn StateStore> {
    Arc::new(
        SqliteState::new_in_memory()
            .await
            .expect("in-memory sqlite should open"),
    )
}
