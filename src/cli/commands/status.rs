use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::{HttpEmbeddingClient, VectorIndex};

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let (embedding_healthy, embedding_model) = match HttpEmbeddingClient::new(&config.embedding) {
        Ok(client) => match client.health_check().await {
            Ok(health) => (true, health.model_id),
            Err(_) => (false, None),
        },
        Err(_) => (false, None),
    };

    let (vector_store_connected, vector_store_points) =
        match VectorIndex::connect(&config.vector_store, config.embedding.dimension).await {
            Ok(index) => {
                let connected = index.health_check().await.unwrap_or(false);
                let points = if connected {
                    index.count().await.unwrap_or(0)
                } else {
                    0
                };
                (connected, points)
            }
            Err(_) => (false, 0),
        };

    let status = StatusInfo {
        embedding_url: config.embedding.url.clone(),
        embedding_healthy,
        embedding_model,
        vector_store_driver: config.vector_store.driver.to_string(),
        vector_store_url: config.vector_store.url.clone(),
        vector_store_connected,
        vector_store_points,
        collection: config.vector_store.collection.clone(),
    };

    print!("{}", formatter.format_status(&status));

    if !embedding_healthy || !vector_store_connected {
        eprintln!();
        if !embedding_healthy {
            eprintln!(
                "Warning: embedding server not reachable at {}",
                config.embedding.url
            );
        }
        if !vector_store_connected {
            match config.vector_store.driver {
                VectorDriver::Memory => {}
                VectorDriver::Qdrant => {
                    eprintln!(
                        "Warning: Qdrant not running. Start with: docker run -p 6334:6334 qdrant/qdrant"
                    );
                }
                VectorDriver::PostgreSQL => {
                    eprintln!("Warning: PostgreSQL not accessible. Check connection settings.");
                }
            }
        }
    }

    Ok(())
}
