use crate::worker::BackgroundWorker;
use donutfield_assets::{MatcapTexture, TextureSource};
use donutfield_common::{CancellationToken, MatcapId};
use std::collections::VecDeque;
use std::sync::Arc;

/// Monotonically increasing request number. Later selections get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// Why a texture load produced no texture.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("load cancelled")]
    Cancelled,
    #[error("{0}")]
    Asset(String),
    #[error("loader is not running")]
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: Ticket,
    pub matcap: MatcapId,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone)]
pub struct LoadCompletion {
    pub ticket: Ticket,
    pub matcap: MatcapId,
    pub result: Result<Arc<MatcapTexture>, LoadError>,
}

/// Where texture requests go and completions come back from.
pub trait LoadQueue {
    fn submit(&mut self, request: LoadRequest);
    fn try_complete(&mut self) -> Option<LoadCompletion>;
}

/// Decodes textures on a dedicated thread.
pub struct BackgroundLoader {
    worker: BackgroundWorker<(Ticket, MatcapId), LoadCompletion>,
    rejected: VecDeque<LoadCompletion>,
}

impl BackgroundLoader {
    pub fn spawn<S: TextureSource>(source: S) -> std::io::Result<Self> {
        let worker = BackgroundWorker::<(Ticket, MatcapId), LoadCompletion>::new("matcap-loader", move |tasks, results| {
            for ((ticket, matcap), cancel) in tasks {
                let result = if cancel.is_cancelled() {
                    Err(LoadError::Cancelled)
                } else {
                    source
                        .load(matcap)
                        .map(Arc::new)
                        .map_err(|e| LoadError::Asset(e.to_string()))
                };
                tracing::debug!(ticket = ticket.0, %matcap, ok = result.is_ok(), "texture load finished");
                if results.send(LoadCompletion { ticket, matcap, result }).is_err() {
                    break;
                }
            }
        })?;
        Ok(Self {
            worker,
            rejected: VecDeque::new(),
        })
    }
}

impl LoadQueue for BackgroundLoader {
    fn submit(&mut self, request: LoadRequest) {
        let LoadRequest { ticket, matcap, cancel } = request;
        if !self.worker.send_task((ticket, matcap), cancel) {
            self.rejected.push_back(LoadCompletion {
                ticket,
                matcap,
                result: Err(LoadError::Disconnected),
            });
        }
    }

    fn try_complete(&mut self) -> Option<LoadCompletion> {
        self.rejected
            .pop_front()
            .or_else(|| self.worker.try_recv_result())
    }
}

/// Queue whose completions are delivered by hand, in any order.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ManualQueue {
    pub submitted: Vec<LoadRequest>,
    ready: VecDeque<LoadCompletion>,
}

#[cfg(test)]
impl ManualQueue {
    /// Complete the submitted request with `ticket`.
    pub fn finish(&mut self, ticket: Ticket, result: Result<Arc<MatcapTexture>, LoadError>) {
        let request = self
            .submitted
            .iter()
            .find(|r| r.ticket == ticket)
            .expect("unknown ticket");
        self.ready.push_back(LoadCompletion {
            ticket,
            matcap: request.matcap,
            result,
        });
    }
}

#[cfg(test)]
impl LoadQueue for ManualQueue {
    fn submit(&mut self, request: LoadRequest) {
        self.submitted.push(request);
    }

    fn try_complete(&mut self) -> Option<LoadCompletion> {
        self.ready.pop_front()
    }
}

#[cfg(test)]
pub(crate) fn texture(matcap: u32) -> Arc<MatcapTexture> {
    Arc::new(MatcapTexture {
        matcap: MatcapId::new(matcap).unwrap(),
        asset: donutfield_common::AssetId(matcap as u64),
        width: 1,
        height: 1,
        rgba: vec![matcap as u8; 4],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use donutfield_assets::{AssetError, FsTextureSource};
    use std::time::{Duration, Instant};

    fn wait(loader: &mut BackgroundLoader) -> LoadCompletion {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(done) = loader.try_complete() {
                return done;
            }
            assert!(Instant::now() < deadline, "loader timed out");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn request(ticket: u64, matcap: u32) -> LoadRequest {
        LoadRequest {
            ticket: Ticket(ticket),
            matcap: MatcapId::new(matcap).unwrap(),
            cancel: CancellationToken::new(),
        }
    }

    struct Solid;

    impl TextureSource for Solid {
        fn load(&self, matcap: MatcapId) -> Result<MatcapTexture, AssetError> {
            Ok((*texture(matcap.index())).clone())
        }
    }

    #[test]
    fn loads_on_worker_thread() {
        let mut loader = BackgroundLoader::spawn(Solid).unwrap();
        loader.submit(request(1, 4));
        let done = wait(&mut loader);
        assert_eq!(done.ticket, Ticket(1));
        assert_eq!(done.result.unwrap().matcap.index(), 4);
    }

    #[test]
    fn cancelled_request_is_not_loaded() {
        let mut loader = BackgroundLoader::spawn(Solid).unwrap();
        let req = request(2, 1);
        req.cancel.cancel();
        loader.submit(req);
        assert_eq!(wait(&mut loader).result.unwrap_err(), LoadError::Cancelled);
    }

    #[test]
    fn missing_file_reports_asset_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = BackgroundLoader::spawn(FsTextureSource::new(dir.path())).unwrap();
        loader.submit(request(3, 8));
        match wait(&mut loader).result {
            Err(LoadError::Asset(message)) => assert!(message.contains("8.png")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
