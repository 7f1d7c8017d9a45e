use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context};
use vmbox_core::{update, AppState, Effect, FormRef, Msg, RegionId, RegionView};
use vmbox_engine::{EngineHandle, ReqwestTaskClient};
use vmbox_logging::{vmbox_info, vmbox_warn};

use super::cli::Cli;
use super::config::AppConfig;
use super::effects::EffectRunner;
use super::interrupt::Interrupt;
use super::ui::render::render_region;

/// Render tick while waiting on the engine.
const TICK: Duration = Duration::from_millis(75);

/// Exit status after Ctrl-C, as shells report SIGINT.
const INTERRUPTED: u8 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitEnd {
    Settled,
    Cancelled,
}

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);

    let client = ReqwestTaskClient::new(config.client_settings())?;
    for cookie in &config.cookies {
        client
            .add_cookie(cookie, &cli.page)
            .with_context(|| format!("seeding cookie for {}", cli.page))?;
    }
    let engine = EngineHandle::with_client(Arc::new(client))?;
    let runner = EffectRunner::new(engine);

    let mut app = App {
        state: AppState::with_config(config.core_config()),
        runner,
        reveal_spoilers: cli.reveal_spoilers,
    };
    let page_deadline = Duration::from_secs(config.connect_timeout_secs + config.request_timeout_secs);
    let region = app.mount(&config.region, &cli.page, page_deadline)?;

    let Some(action) = cli.action.as_deref() else {
        app.render(region);
        return Ok(ExitCode::SUCCESS);
    };

    let form = app.pick_form(region, action, cli.form)?;
    let interrupt = Interrupt::install()?;
    app.dispatch(Msg::FormSubmitted {
        region,
        form,
        action: action.to_string(),
    });
    let end = app.run_until_idle(region, &interrupt);
    app.runner.shutdown();
    if end? == WaitEnd::Cancelled {
        vmbox_warn!("Action {} cancelled before the task finished", action);
        return Ok(ExitCode::from(INTERRUPTED));
    }

    let view = app.region_view(region)?;
    match &view.last_failure {
        None => Ok(ExitCode::SUCCESS),
        Some(kind) => {
            vmbox_warn!("Action {} ended with failure: {}", action, kind);
            Ok(ExitCode::FAILURE)
        }
    }
}

struct App {
    state: AppState,
    runner: EffectRunner,
    reveal_spoilers: bool,
}

impl App {
    fn mount(&mut self, name: &str, page: &str, deadline: Duration) -> anyhow::Result<RegionId> {
        self.runner.load_page(name, page);
        let started = Instant::now();
        let msg = loop {
            if let Some(result) = self.runner.next_msg(TICK)? {
                break result.with_context(|| format!("loading {page}"))?;
            }
            if started.elapsed() > deadline {
                bail!("timed out loading {page}");
            }
        };
        self.dispatch(msg);
        self.state
            .region_by_name(name)
            .ok_or_else(|| anyhow!("region {name} could not be mounted from {page}"))
    }

    fn pick_form(&self, region: RegionId, action: &str, index: Option<usize>) -> anyhow::Result<FormRef> {
        let view = self.region_view(region)?;
        let offering: Vec<_> = view
            .forms
            .iter()
            .filter(|form| form.actions.iter().any(|a| a == action))
            .collect();
        let chosen = match index {
            Some(index) => view.forms.get(index).filter(|form| offering.contains(form)),
            None => offering.first().copied(),
        };
        match chosen {
            Some(form) => Ok(form.form),
            None => {
                let available: Vec<String> = view
                    .forms
                    .iter()
                    .flat_map(|form| form.actions.iter().cloned())
                    .collect();
                bail!(
                    "no bound form in {} offers {action:?}; available: [{}]",
                    view.name,
                    available.join(", ")
                )
            }
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects): (AppState, Vec<Effect>) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    /// Feeds engine results into the core until the region is no longer busy.
    /// Ctrl-C cancels the wait; a vanished engine cancels it and is an error.
    fn run_until_idle(&mut self, region: RegionId, interrupt: &Interrupt) -> anyhow::Result<WaitEnd> {
        let mut end = WaitEnd::Settled;
        self.render_if_dirty(region);
        while self.state.region(region).is_some_and(|r| r.is_busy()) {
            let msg = if interrupt.take() {
                vmbox_info!("Interrupted; cancelling region #{}", region);
                end = WaitEnd::Cancelled;
                Msg::CancelRequested { region }
            } else {
                match self.runner.next_msg(TICK) {
                    Ok(Some(Ok(msg))) => msg,
                    Ok(Some(Err(err))) => {
                        vmbox_warn!("Unexpected engine error: {}", err);
                        Msg::NoOp
                    }
                    Ok(None) => Msg::Tick,
                    Err(err) => {
                        self.dispatch(Msg::CancelRequested { region });
                        return Err(err).with_context(|| format!("waiting on region #{region}"));
                    }
                }
            };
            self.dispatch(msg);
            self.render_if_dirty(region);
        }
        vmbox_info!("Region #{} is idle", region);
        Ok(end)
    }

    fn render_if_dirty(&mut self, region: RegionId) {
        if self.state.consume_dirty() {
            self.render(region);
        }
    }

    fn render(&self, region: RegionId) {
        if let Ok(view) = self.region_view(region) {
            println!("{}", render_region(&view, self.reveal_spoilers));
        }
    }

    fn region_view(&self, region: RegionId) -> anyhow::Result<RegionView> {
        self.state
            .view()
            .regions
            .into_iter()
            .find(|view| view.id == region)
            .ok_or_else(|| anyhow!("region #{region} is gone"))
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;
    use std::sync::Arc;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use vmbox_core::{AppState, Msg, PendingAction, PollOutcome, RegionId, TaskHandle};
    use vmbox_engine::{EngineHandle, TaskClient, TaskError};

    use super::{App, WaitEnd};
    use crate::platform::effects::EffectRunner;
    use crate::platform::interrupt::Interrupt;

    /// A server that accepts requests and never answers.
    struct Stalled;

    #[async_trait]
    impl TaskClient for Stalled {
        async fn initiate(&self, _action: &PendingAction) -> Result<TaskHandle, TaskError> {
            pending().await
        }

        async fn check(&self, _handle: &TaskHandle) -> Result<PollOutcome, TaskError> {
            pending().await
        }

        async fn load_page(&self, _url: &str) -> Result<String, TaskError> {
            pending().await
        }
    }

    fn busy_app() -> (App, RegionId) {
        vmbox_logging::initialize_for_tests();
        let engine = EngineHandle::with_client(Arc::new(Stalled)).expect("engine");
        let mut app = App {
            state: AppState::new(),
            runner: EffectRunner::new(engine),
            reveal_spoilers: false,
        };
        app.dispatch(Msg::RegionMounted {
            name: "scenario_sidebar".to_string(),
            base_url: "http://lab.example/scenario/show/web".to_string(),
            markup: r#"<form name="vmbox_form" action="/scenario/manage_vm/web"><button name="action" value="start">start</button></form>"#.to_string(),
        });
        let region = app.state.region_by_name("scenario_sidebar").expect("region");
        let form = app.pick_form(region, "start", None).expect("form");
        app.dispatch(Msg::FormSubmitted {
            region,
            form,
            action: "start".to_string(),
        });
        assert!(app.state.region(region).unwrap().is_busy());
        (app, region)
    }

    #[test]
    fn interrupt_cancels_the_wait() {
        let (mut app, region) = busy_app();
        let interrupt = Interrupt::default();
        interrupt.trigger();

        let end = app.run_until_idle(region, &interrupt).unwrap();
        assert_eq!(end, WaitEnd::Cancelled);
        let sidebar = app.state.region(region).unwrap();
        assert!(!sidebar.is_busy());
        assert_eq!(sidebar.forms().len(), 1);
    }

    #[test]
    fn stopped_engine_ends_the_wait_with_an_error() {
        let (mut app, region) = busy_app();
        app.runner.shutdown();

        let err = app.run_until_idle(region, &Interrupt::default()).unwrap_err();
        assert!(format!("{err:#}").contains("engine event loop has stopped"));
        assert!(!app.state.region(region).unwrap().is_busy());
    }
}
