// ── Remote source ──
//
// Adapts `vela_api::RemoteClient` to the shapes the data layer consumes:
// page loaders for the paginator, raw collection pulls for import.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use vela_api::{IdRecord, RemoteClient};

use super::LocalSource;
use crate::error::CoreError;
use crate::paginator::{PageData, PageLoader, page_loader};
use crate::record::Record;

/// Facade over the remote collection API.
#[derive(Clone)]
pub struct RemoteSource {
    client: Arc<RemoteClient>,
}

impl RemoteSource {
    pub fn new(client: RemoteClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Build a paginator loader over the given collection path.
    ///
    /// Each invocation fetches one ID page and reports the collection
    /// total; transport failures surface as [`CoreError::Api`].
    pub fn page_loader(&self, path: &str) -> PageLoader<String> {
        let client = Arc::clone(&self.client);
        let path = path.to_owned();

        page_loader(move |offset, limit| {
            let client = Arc::clone(&client);
            let path = path.clone();
            async move {
                let page = client.get_page::<IdRecord>(&path, offset, limit).await?;
                Ok(PageData {
                    ids: page.data.into_iter().map(|r| r.id).collect(),
                    total: page.total_count,
                })
            }
        })
    }

    /// Pull a whole remote collection and merge it into the local
    /// source. Returns the number of records imported.
    pub async fn import_collection<T>(
        &self,
        path: &str,
        local: &LocalSource,
    ) -> Result<usize, CoreError>
    where
        T: Record + DeserializeOwned,
    {
        debug!(path, "importing remote collection");
        let payload = self.client.get_collection(path).await?;
        local.import_json::<T>(payload).await
    }
}
