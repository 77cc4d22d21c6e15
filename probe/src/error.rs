use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("error HTTP consultando metadata ECS: {0}")]
    Http(#[from] reqwest::Error),

    #[error("el servicio de metadata respondió {status} para el cluster '{cluster}'")]
    Status { cluster: String, status: u16 },

    #[error("URL de metadata inválida: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("no se pudo obtener la info ECS del cluster '{cluster}': {source}")]
    Fetch {
        cluster: String,
        #[source]
        source: FetchError,
    },

    #[error("la pasada de tagging terminó abruptamente: {0}")]
    Panicked(#[from] tokio::task::JoinError),
}

impl TagError {
    /// Cluster que abortó la pasada, si fue un fetch.
    pub fn cluster(&self) -> Option<&str> {
        match self {
            TagError::Fetch { cluster, .. } => Some(cluster),
            TagError::Panicked(_) => None,
        }
    }
}
