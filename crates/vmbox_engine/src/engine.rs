use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use vmbox_core::{Effect, RegionId};
use vmbox_logging::{vmbox_debug, vmbox_info};

use crate::client::{ClientSettings, ReqwestTaskClient, TaskClient};
use crate::{EngineError, EngineEvent};

enum EngineCommand {
    LoadPage { name: String, url: String },
    Run(Effect),
    Shutdown,
}

/// Executes core effects on a dedicated single-threaded event loop and
/// reports results as [`EngineEvent`]s.
pub struct EngineHandle {
    cmd_tx: UnboundedSender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: ClientSettings) -> Result<Self, EngineError> {
        let client = ReqwestTaskClient::new(settings)?;
        Self::with_client(Arc::new(client))
    }

    pub fn with_client(client: Arc<dyn TaskClient>) -> Result<Self, EngineError> {
        let (cmd_tx, cmd_rx) = unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("vmbox-engine".to_string())
            .spawn(move || runtime.block_on(run_loop(client, cmd_rx, event_tx)))?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn load_page(&self, name: impl Into<String>, url: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::LoadPage {
            name: name.into(),
            url: url.into(),
        });
    }

    pub fn execute(&self, effect: Effect) {
        let _ = self.cmd_tx.send(EngineCommand::Run(effect));
    }

    pub fn execute_all(&self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Cancels all pending work and stops the event loop.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Shutdown);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// `Ok(None)` on timeout; `Err(EngineError::Disconnected)` once the event
    /// loop is gone and no further events can arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }
}

async fn run_loop(
    client: Arc<dyn TaskClient>,
    mut cmd_rx: UnboundedReceiver<EngineCommand>,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    // One token per region; cancelling it drops every wait and request
    // scheduled for that region so far.
    let mut tokens: HashMap<RegionId, CancellationToken> = HashMap::new();

    while let Some(command) = cmd_rx.recv().await {
        let client = client.clone();
        let event_tx = event_tx.clone();
        match command {
            EngineCommand::LoadPage { name, url } => {
                tokio::spawn(async move {
                    let result = client.load_page(&url).await;
                    let _ = event_tx.send(EngineEvent::PageLoaded { name, url, result });
                });
            }
            EngineCommand::Run(Effect::Initiate {
                region,
                dispatch,
                action,
            }) => {
                let token = region_token(&mut tokens, region);
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            vmbox_debug!("Initiation for region #{} cancelled", region);
                        }
                        result = client.initiate(&action) => {
                            let _ = event_tx.send(EngineEvent::TaskStarted {
                                region,
                                dispatch,
                                result,
                            });
                        }
                    }
                });
            }
            EngineCommand::Run(Effect::SchedulePoll {
                region,
                handle,
                delay,
            }) => {
                let token = region_token(&mut tokens, region);
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            vmbox_debug!("Poll of task {} cancelled", handle.task_id);
                        }
                        result = async {
                            tokio::time::sleep(delay).await;
                            client.check(&handle).await
                        } => {
                            let _ = event_tx.send(EngineEvent::PollFinished {
                                region,
                                task_id: handle.task_id.clone(),
                                result,
                            });
                        }
                    }
                });
            }
            EngineCommand::Run(Effect::CancelPoll { region }) => {
                if let Some(token) = tokens.remove(&region) {
                    vmbox_info!("Cancelling pending work for region #{}", region);
                    token.cancel();
                }
            }
            EngineCommand::Shutdown => {
                vmbox_info!("Engine shutting down");
                for (_, token) in tokens.drain() {
                    token.cancel();
                }
                break;
            }
        }
    }
}

fn region_token(tokens: &mut HashMap<RegionId, CancellationToken>, region: RegionId) -> CancellationToken {
    tokens
        .entry(region)
        .or_insert_with(CancellationToken::new)
        .clone()
}
