use std::sync::Arc;
use std::time::Duration;

use common::{DescribeRequest, EcsInfo};
use reqwest::Url;
use tracing::debug;

use crate::error::FetchError;

/// Máximo de ARNs por describe, igual que el límite de la API de ECS.
pub const DESCRIBE_BATCH_SIZE: usize = 100;

/// Fuente de verdad de tasks y servicios de un cluster.
pub trait MetadataFetcher: Send + Sync {
    fn fetch_info(&self, cluster: &str, task_arns: &[String]) -> Result<EcsInfo, FetchError>;
}

impl<T: MetadataFetcher + ?Sized> MetadataFetcher for Arc<T> {
    fn fetch_info(&self, cluster: &str, task_arns: &[String]) -> Result<EcsInfo, FetchError> {
        (**self).fetch_info(cluster, task_arns)
    }
}

/// Cliente HTTP bloqueante contra el servicio de metadata ECS.
/// Se llama desde un hilo de bloqueo, nunca desde el runtime async.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// `{base_url}/api/v1/clusters/{cluster}/describe`, con el cluster escapado.
    fn describe_url(&self, cluster: &str) -> Result<Url, FetchError> {
        let invalid = || FetchError::InvalidUrl(self.base_url.clone());
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["api", "v1", "clusters", cluster, "describe"]);
        Ok(url)
    }
}

impl MetadataFetcher for HttpFetcher {
    fn fetch_info(&self, cluster: &str, task_arns: &[String]) -> Result<EcsInfo, FetchError> {
        // un cliente por cluster, con el timeout configurado
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let url = self.describe_url(cluster)?;

        let mut info = EcsInfo::default();
        for batch in task_arns.chunks(DESCRIBE_BATCH_SIZE) {
            debug!("describe de {} tasks en {} ({})", batch.len(), cluster, url);

            let resp = client
                .post(url.clone())
                .json(&DescribeRequest {
                    task_arns: batch.to_vec(),
                })
                .send()?;

            if !resp.status().is_success() {
                return Err(FetchError::Status {
                    cluster: cluster.to_string(),
                    status: resp.status().as_u16(),
                });
            }

            info.extend(resp.json::<EcsInfo>()?);
        }

        Ok(info)
    }
}
