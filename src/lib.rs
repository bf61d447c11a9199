pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod notebook;
pub mod storage;
pub mod sync;
pub mod view;


#[cfg(test)]
mod observer_bracket_test;


use std::sync::Arc;

pub use cache::RecordCache;
pub use catalog::mime::{NotebookDragPayload, NOTEBOOK_MIME_TYPE};
pub use catalog::{CatalogSnapshot, NotebookCatalog};
pub use config::CatalogConfig;
pub use error::{CatalogError, ErrorKind, Result};
pub use notebook::{LinkedNotebook, NotebookFilter, NotebookFlags, NotebookRecord};
pub use storage::{InMemoryStorage, NotebookStorage, StorageError, StorageEvent};
pub use sync::NotebookModel;
pub use view::{CellValue, Column, ItemFlags, ItemId, ModelObserver, NoopObserver, Role, SortOrder, TreeAccessor};

/// Seed an in-memory store with a small account, load it and log the tree.
async fn demo(config: CatalogConfig) -> Result<()> {
    let storage = Arc::new(InMemoryStorage::new());

    let mut inbox = NotebookRecord::new_local("Inbox", None);
    inbox.flags.default = true;
    inbox.flags.dirty = false;
    let inbox_id = inbox.local_id.clone();
    storage.seed_notebook(inbox).await;
    for (name, stack) in [("Draft", Some("Projects")), ("Release", Some("Projects")), ("Journal", None)] {
        let mut record = NotebookRecord::new_local(name, stack);
        record.flags.dirty = false;
        storage.seed_notebook(record).await;
    }
    storage
        .seed_linked_notebook(LinkedNotebook {
            guid: "shared-1".to_string(),
            username: "alice".to_string(),
            share_name: Some("Recipes".to_string()),
        })
        .await;
    let mut shared = NotebookRecord::new_local("Recipes", None);
    shared.linked_notebook_guid = Some("shared-1".to_string());
    shared.guid = Some("remote-recipes".to_string());
    storage.seed_notebook(shared).await;

    let events = storage.subscribe().await;
    let (mut model, mut errors) = NotebookModel::new(storage.clone(), config, Box::new(NoopObserver));
    model.listen(events);
    model.start();
    model.run_until_idle().await;

    storage
        .add_note(&inbox_id)
        .await
        .map_err(|e| CatalogError::storage("add note", e))?;
    model.create_notebook("Reading list", Some("Projects"))?;
    model.run_until_idle().await;

    while let Ok(err) = errors.try_recv() {
        log::warn!("[Demo] {}", err);
    }
    log::info!(
        "[Demo] {} notebooks, fully listed: {}\n{}",
        model.catalog().len(),
        model.is_fully_listed(),
        model.catalog().outline()
    );
    Ok(())
}

pub fn run() {
    logging::init_from_env();
    let config = CatalogConfig::from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("[Main] Failed to start runtime: {}", e);
            return;
        }
    };
    if let Err(e) = runtime.block_on(demo(config)) {
        log::error!("[Main] {}", e);
    }
}
