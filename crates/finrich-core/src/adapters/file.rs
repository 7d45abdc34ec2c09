use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::data_source::SourceError;
use crate::source::IdentifierSource;
use crate::table::load_identifiers;
use crate::Identifier;

/// Identifier list previously saved as a `Symbol` table.
#[derive(Debug, Clone)]
pub struct CsvListSource {
    path: PathBuf,
}

impl CsvListSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentifierSource for CsvListSource {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_identifiers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Identifier>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let path = self.path.clone();
            tokio::task::spawn_blocking(move || load_identifiers(&path))
                .await
                .map_err(|error| SourceError::internal(format!("ticker file task failed: {error}")))?
                .map_err(|error| {
                    SourceError::invalid_request(format!(
                        "cannot read tickers from '{}': {error}",
                        self.path.display()
                    ))
                })
        })
    }
}
