use std::time::Duration;

use chrono::Utc;
use common::{Report, TagSummary};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::TagError;
use crate::state::AppState;

/// Algo que deriva padres/nodos nuevos a partir del reporte.
pub trait Tagger: Send + Sync {
    fn name(&self) -> &'static str;

    /// Modifica `rpt` en el lugar. Si devuelve error, lo que alcanzó a
    /// escribir queda en `rpt`.
    fn tag(&self, rpt: &mut Report) -> Result<TagSummary, TagError>;
}

/// Loop de tagging periódico: una pasada por intervalo. Comparte el lock de
/// pasadas con el disparo por HTTP.
pub async fn run_tagging_loop(state: AppState, interval: Duration) {
    loop {
        sleep(interval).await;

        if let Err(e) = tag_once(&state).await {
            warn!(cluster = ?e.cluster(), "error en pasada de tagging: {}", e);
        }
    }
}

/// Una pasada:
/// 1. espera a que termine la pasada en curso, si hay una
/// 2. copia el reporte vivo
/// 3. corre el tagger sobre la copia en un hilo de bloqueo (el fetch bloquea)
/// 4. publica la copia, haya fallado o no, y guarda el estado de la pasada
pub async fn tag_once(state: &AppState) -> Result<TagSummary, TagError> {
    let _pass = state.pass_lock.lock().await;

    let snapshot = state.report_snapshot();
    let tagger = state.tagger.clone();

    let joined = tokio::task::spawn_blocking(move || {
        let mut rpt = snapshot;
        let result = tagger.tag(&mut rpt);
        (rpt, result)
    })
    .await;

    let (tagged, result) = match joined {
        Ok(done) => done,
        Err(e) => {
            // la copia se perdió con el panic: no hay nada que publicar
            let err = TagError::from(e);
            state.record_status(None, Some(err.to_string()), Utc::now());
            return Err(err);
        }
    };

    state.publish(tagged);

    match &result {
        Ok(summary) => {
            info!(
                "pasada {} publicada ({} contenedores tagueados)",
                summary.pass_id, summary.containers_tagged
            );
            state.record_status(Some(summary.clone()), None, Utc::now());
        }
        Err(e) => {
            state.record_status(None, Some(e.to_string()), Utc::now());
        }
    }

    result
}
