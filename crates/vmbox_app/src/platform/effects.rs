use std::time::Duration;

use vmbox_core::{Effect, Msg};
use vmbox_engine::{EngineError, EngineEvent, EngineHandle, TaskError};
use vmbox_logging::{vmbox_debug, vmbox_info};

/// Hands core effects to the engine and turns engine events back into messages.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle) -> Self {
        Self { engine }
    }

    pub fn load_page(&self, region: &str, url: &str) {
        vmbox_info!("Loading region {} from {}", region, url);
        self.engine.load_page(region, url);
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match &effect {
                Effect::Initiate {
                    region,
                    dispatch,
                    action,
                } => {
                    vmbox_info!(
                        "Initiate region=#{} dispatch={} action={} endpoint={}",
                        region,
                        dispatch,
                        action.action_name,
                        action.endpoint_url
                    );
                }
                Effect::SchedulePoll {
                    region,
                    handle,
                    delay,
                } => {
                    vmbox_debug!(
                        "SchedulePoll region=#{} task_id={} delay_ms={}",
                        region,
                        handle.task_id,
                        delay.as_millis()
                    );
                }
                Effect::CancelPoll { region } => {
                    vmbox_info!("CancelPoll region=#{}", region);
                }
            }
            self.engine.execute(effect);
        }
    }

    /// Waits up to `timeout` for the next engine result. `Ok(None)` means
    /// nothing arrived yet; `Err` means the engine is gone.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Result<Msg, TaskError>>, EngineError> {
        Ok(self.engine.recv_timeout(timeout)?.map(EngineEvent::into_msg))
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }
}
