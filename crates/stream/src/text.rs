use crate::worker::BackgroundWorker;
use donutfield_assets::{MeshData, TextParams, TypefaceFont, centered_text_mesh};
use donutfield_common::CancellationToken;
use donutfield_kernel::{MeshId, Scene, SceneError};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextLoadError {
    #[error("text mesh: {0}")]
    Asset(String),
    #[error("text load cancelled")]
    Cancelled,
    #[error("text loader stopped before finishing")]
    Disconnected,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Debug, Clone)]
struct TextJob {
    font_path: PathBuf,
    label: String,
    params: TextParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Loading,
    Done,
}

/// Builds the label mesh once, off the main thread.
pub struct TextMeshLoader {
    worker: BackgroundWorker<TextJob, Result<MeshData, TextLoadError>>,
    cancel: CancellationToken,
    stage: Stage,
}

impl TextMeshLoader {
    pub fn spawn(
        font_path: impl Into<PathBuf>,
        label: impl Into<String>,
        params: TextParams,
    ) -> std::io::Result<Self> {
        let worker = BackgroundWorker::new("text-loader", |jobs, results| {
            for (job, cancel) in jobs {
                let result = if cancel.is_cancelled() {
                    Err(TextLoadError::Cancelled)
                } else {
                    build(&job)
                };
                if results.send(result).is_err() {
                    break;
                }
            }
        })?;

        let job = TextJob {
            font_path: font_path.into(),
            label: label.into(),
            params,
        };
        let cancel = CancellationToken::new();
        let stage = if worker.send_task(job, cancel.clone()) {
            Stage::Loading
        } else {
            Stage::Done
        };
        Ok(Self {
            worker,
            cancel,
            stage,
        })
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// Insert the finished mesh into `scene`. Yields a value exactly once.
    pub fn poll(&mut self, scene: &mut Scene) -> Option<Result<MeshId, TextLoadError>> {
        if self.stage == Stage::Done {
            return None;
        }
        let result = self.worker.try_recv_result()?;
        self.stage = Stage::Done;
        let inserted = result.and_then(|mesh| scene.set_text_mesh(mesh).map_err(TextLoadError::from));
        if let Err(error) = &inserted {
            tracing::warn!(%error, "continuing without text label");
        }
        Some(inserted)
    }
}

fn build(job: &TextJob) -> Result<MeshData, TextLoadError> {
    let _span = tracing::info_span!("text_mesh", label = %job.label).entered();
    let font = TypefaceFont::from_path(&job.font_path)
        .map_err(|e| TextLoadError::Asset(e.to_string()))?;
    let mesh = centered_text_mesh(&font, &job.label, &job.params)
        .map_err(|e| TextLoadError::Asset(e.to_string()))?;
    tracing::info!(
        family = %font.family,
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "text mesh built"
    );
    Ok(mesh)
}
