use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::PixelBuffer;
use crate::events::{ImageAvailable, ProcessorCommand, ProcessorEvent, ProcessorFailure};
use crate::processing::engine::{FilterEngine, FilterId};
use crate::tasks::loader::decode_rgba8;

/// Owns the current source image and runs loads and filters off the async threads.
///
/// Rules:
/// - Every command gets the next generation number.
/// - A finished job is delivered only if no newer command arrived meanwhile;
///   older jobs run to completion and are then dropped.
/// - `Apply` issued while a load is pending waits for that load and then
///   filters the new source.
/// - `Apply` with no source is ignored.
/// - Exits on cancel, when the sink closes, or once commands are closed and
///   in-flight work has drained.
pub async fn run(
    mut commands: Receiver<ProcessorCommand>,
    to_sink: Sender<ProcessorEvent>,
    cancel: CancellationToken,
    engine: FilterEngine,
) -> Result<()> {
    let mut state = ProcessorState::new(engine);
    let mut jobs: JoinSet<Completed> = JoinSet::new();
    let mut commands_open = true;

    loop {
        if !commands_open && jobs.is_empty() {
            break;
        }

        select! {
            _ = cancel.cancelled() => break,

            maybe_cmd = commands.recv(), if commands_open => {
                let Some(cmd) = maybe_cmd else {
                    commands_open = false;
                    continue;
                };
                if let Some(event) = state.handle(cmd, &mut jobs) {
                    if to_sink.send(event).await.is_err() {
                        break;
                    }
                }
            }

            Some(joined) = jobs.join_next() => {
                let completed = match joined {
                    Ok(completed) => completed,
                    Err(err) => {
                        warn!("processor job panicked or was aborted: {err}");
                        continue;
                    }
                };
                if let Some(event) = state.complete(completed, &mut jobs) {
                    if to_sink.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    jobs.shutdown().await;
    Ok(())
}

enum Completed {
    Loaded {
        generation: u64,
        path: PathBuf,
        result: Result<PixelBuffer, String>,
        elapsed: Duration,
    },
    Filtered {
        generation: u64,
        filter: FilterId,
        result: Result<PixelBuffer, String>,
        elapsed: Duration,
    },
}

struct ProcessorState {
    engine: Arc<FilterEngine>,
    source: Option<Arc<PixelBuffer>>,
    latest: u64,
    pending_load: Option<u64>,
    deferred: Option<(u64, FilterId)>,
}

impl ProcessorState {
    fn new(engine: FilterEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            source: None,
            latest: 0,
            pending_load: None,
            deferred: None,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    fn handle(
        &mut self,
        cmd: ProcessorCommand,
        jobs: &mut JoinSet<Completed>,
    ) -> Option<ProcessorEvent> {
        let generation = self.next_generation();
        match cmd {
            ProcessorCommand::Load(path) => {
                debug!(generation, "loading {}", path.display());
                self.pending_load = Some(generation);
                self.deferred = None;
                jobs.spawn_blocking(move || {
                    let started = Instant::now();
                    let result = decode_rgba8(&path).map_err(|err| err.to_string());
                    Completed::Loaded {
                        generation,
                        path,
                        result,
                        elapsed: started.elapsed(),
                    }
                });
                None
            }
            ProcessorCommand::SetSource(buffer) => {
                self.pending_load = None;
                self.deferred = None;
                let image = Arc::new(buffer);
                self.source = Some(Arc::clone(&image));
                Some(ProcessorEvent::ImageAvailable(ImageAvailable {
                    generation,
                    filter: FilterId::None,
                    image,
                    elapsed: Duration::ZERO,
                }))
            }
            ProcessorCommand::Apply(filter) => {
                if self.pending_load.is_some() {
                    debug!(generation, %filter, "deferring filter until load completes");
                    self.deferred = Some((generation, filter));
                } else if let Some(source) = self.source.clone() {
                    self.spawn_filter(jobs, generation, filter, source);
                } else {
                    debug!(generation, %filter, "no source image loaded; ignoring filter request");
                }
                None
            }
        }
    }

    fn complete(
        &mut self,
        completed: Completed,
        jobs: &mut JoinSet<Completed>,
    ) -> Option<ProcessorEvent> {
        match completed {
            Completed::Loaded {
                generation,
                path,
                result,
                elapsed,
            } => {
                if self.pending_load != Some(generation) {
                    debug!(generation, "discarding superseded load of {}", path.display());
                    return None;
                }
                self.pending_load = None;
                let deferred = self.deferred.take();
                match result {
                    Ok(buffer) => {
                        info!(
                            width = buffer.width(),
                            height = buffer.height(),
                            elapsed_ms = elapsed.as_millis() as u64,
                            "loaded {}",
                            path.display()
                        );
                        let image = Arc::new(buffer);
                        self.source = Some(Arc::clone(&image));
                        if let Some((filter_generation, filter)) = deferred {
                            self.spawn_filter(jobs, filter_generation, filter, image);
                            return None;
                        }
                        (generation == self.latest).then(|| {
                            ProcessorEvent::ImageAvailable(ImageAvailable {
                                generation,
                                filter: FilterId::None,
                                image,
                                elapsed,
                            })
                        })
                    }
                    Err(reason) => {
                        warn!("unable to decode {}: {reason}", path.display());
                        if let Some((filter_generation, filter)) = deferred {
                            debug!(filter_generation, %filter, "dropping filter request after failed load");
                        }
                        Some(ProcessorEvent::Failed(ProcessorFailure {
                            generation,
                            filter: None,
                            reason,
                        }))
                    }
                }
            }
            Completed::Filtered {
                generation,
                filter,
                result,
                elapsed,
            } => {
                if generation != self.latest {
                    debug!(generation, latest = self.latest, %filter, "discarding superseded result");
                    return None;
                }
                match result {
                    Ok(image) => Some(ProcessorEvent::ImageAvailable(ImageAvailable {
                        generation,
                        filter,
                        image: Arc::new(image),
                        elapsed,
                    })),
                    Err(reason) => {
                        warn!(%filter, "filter failed: {reason}");
                        Some(ProcessorEvent::Failed(ProcessorFailure {
                            generation,
                            filter: Some(filter),
                            reason,
                        }))
                    }
                }
            }
        }
    }

    fn spawn_filter(
        &self,
        jobs: &mut JoinSet<Completed>,
        generation: u64,
        filter: FilterId,
        source: Arc<PixelBuffer>,
    ) {
        let engine = Arc::clone(&self.engine);
        jobs.spawn_blocking(move || {
            let started = Instant::now();
            let result = engine.apply(&source, filter).map_err(|err| err.to_string());
            Completed::Filtered {
                generation,
                filter,
                result,
                elapsed: started.elapsed(),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn solid(width: u32, height: u32, pixel: [u8; 4]) -> PixelBuffer {
        PixelBuffer::from_pixels(width, height, vec![pixel; (width * height) as usize]).unwrap()
    }

    async fn drain(mut rx: mpsc::Receiver<ProcessorEvent>) -> Vec<ProcessorEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn set_source_is_echoed_and_filter_follows() {
        let (tx_cmd, rx_cmd) = mpsc::channel(4);
        let (tx_ev, rx_ev) = mpsc::channel(4);

        tx_cmd
            .send(ProcessorCommand::SetSource(solid(3, 3, [200, 100, 50, 255])))
            .await
            .unwrap();
        tx_cmd
            .send(ProcessorCommand::Apply(FilterId::Greyscale))
            .await
            .unwrap();
        drop(tx_cmd);

        run(rx_cmd, tx_ev, CancellationToken::new(), FilterEngine::default())
            .await
            .unwrap();
        let events = drain(rx_ev).await;

        assert_eq!(events.len(), 2);
        let ProcessorEvent::ImageAvailable(first) = &events[0] else {
            panic!("expected source echo");
        };
        assert_eq!(first.generation, 1);
        assert_eq!(first.filter, FilterId::None);
        let ProcessorEvent::ImageAvailable(second) = &events[1] else {
            panic!("expected filtered image");
        };
        assert_eq!(second.generation, 2);
        assert_eq!(second.filter, FilterId::Greyscale);
        let px = second.image.get(1, 1).unwrap();
        assert_eq!(px[0], px[2]);
    }

    #[tokio::test]
    async fn apply_without_source_is_ignored() {
        let (tx_cmd, rx_cmd) = mpsc::channel(1);
        let (tx_ev, rx_ev) = mpsc::channel(1);
        tx_cmd
            .send(ProcessorCommand::Apply(FilterId::Edge))
            .await
            .unwrap();
        drop(tx_cmd);

        run(rx_cmd, tx_ev, CancellationToken::new(), FilterEngine::default())
            .await
            .unwrap();
        assert!(drain(rx_ev).await.is_empty());
    }

    #[tokio::test]
    async fn failed_load_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let (tx_cmd, rx_cmd) = mpsc::channel(2);
        let (tx_ev, rx_ev) = mpsc::channel(2);
        tx_cmd
            .send(ProcessorCommand::Load(dir.path().join("missing.png")))
            .await
            .unwrap();
        drop(tx_cmd);

        run(rx_cmd, tx_ev, CancellationToken::new(), FilterEngine::default())
            .await
            .unwrap();
        let events = drain(rx_ev).await;
        assert_eq!(events.len(), 1);
        let ProcessorEvent::Failed(failure) = &events[0] else {
            panic!("expected failure");
        };
        assert_eq!(failure.generation, 1);
        assert!(failure.filter.is_none());
    }

    #[tokio::test]
    async fn stops_when_cancelled() {
        let (_tx_cmd, rx_cmd) = mpsc::channel::<ProcessorCommand>(1);
        let (tx_ev, _rx_ev) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        run(rx_cmd, tx_ev, cancel, FilterEngine::default())
            .await
            .unwrap();
    }
}
