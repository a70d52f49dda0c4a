mod ask;
mod chat;
mod clear;
mod config;
mod index;
mod search;
mod status;

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use clear::ClearArgs;
pub use config::ConfigCommand;
pub use index::IndexArgs;
pub use search::SearchArgs;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use clear::handle_clear;
pub use config::handle_config;
pub use index::handle_index;
pub use search::handle_search;
pub use status::handle_status;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::warn;

use crate::models::{Config, VectorDriver};
use crate::services::{EmbeddingProvider, HttpEmbeddingClient, IndexHandle, VectorIndex};

/// Embedding client for the configured server.
pub(crate) fn embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let client =
        HttpEmbeddingClient::new(&config.embedding).context("failed to create embedding client")?;
    Ok(Arc::new(client))
}

/// Connect to the configured vector store, creating the collection if needed.
pub(crate) async fn open_index(config: &Config) -> Result<IndexHandle> {
    let index = VectorIndex::connect(&config.vector_store, config.embedding.dimension)
        .await
        .with_context(|| {
            format!(
                "failed to connect to {} vector store",
                config.vector_store.driver
            )
        })?;
    index
        .ensure_collection()
        .await
        .context("failed to prepare collection")?;
    Ok(IndexHandle::new(index))
}

/// Warn when a command reads an index that cannot outlive this process.
pub(crate) fn warn_if_ephemeral(config: &Config) {
    if config.vector_store.driver == VectorDriver::Memory {
        warn!("the memory driver keeps no data between runs; use `repoqa chat <path>`");
    }
}
