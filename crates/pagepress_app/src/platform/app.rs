use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pagepress_core::{update, AppState, Msg, Phase};
use pagepress_engine::{HostContext, PdfConverter, StaticPlatform, UiLoop};
use pagepress_logging::{press_debug, press_info};

use super::cli::Args;
use super::effects::EffectRunner;
use super::render::TerminalView;
use super::settings::{self, Settings};

const TICK: Duration = Duration::from_millis(75);

/// Runs one conversion from the command line. The main thread is the UI
/// thread: it pumps the [`UiLoop`] so converter callbacks land here.
pub fn run_app() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let config_path = args.config.clone();
    let file_settings = settings::load(&config_path)?;
    let settings = Settings::resolve(args, file_settings);

    match &settings.log_file {
        Some(path) => pagepress_logging::initialize_with_file(
            settings.log_destination,
            settings.log_level,
            path,
        ),
        None => pagepress_logging::initialize(settings.log_destination, settings.log_level),
    }
    press_info!("PagePress starting (settings file {:?})", config_path);

    let (ui_loop, ui_handle) = UiLoop::new();
    let mut builder = HostContext::builder(Arc::new(ui_handle))
        .platform(Arc::new(StaticPlatform(settings.platform_level)));
    if let Some(root) = &settings.shared_root {
        builder = builder.shared_root(root);
    }
    if let Some(root) = &settings.downloads_root {
        builder = builder.downloads_root(root);
    }
    let context = builder
        .build()
        .context("failed to start the conversion runtime")?;
    let converter = PdfConverter::create(&context);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let mut shell = Shell::new(
        AppState::with_defaults(settings.defaults),
        EffectRunner::new(converter, msg_tx),
    );
    shell.dispatch(Msg::RequestReceived(settings.request));
    shell.dispatch(Msg::ConvertClicked);

    while shell.phase() == Phase::Converting {
        ui_loop.run_until(TICK, || false);
        for msg in msg_rx.try_iter() {
            shell.dispatch(msg);
        }
        shell.dispatch(Msg::Tick);
    }

    Ok(match shell.phase() {
        Phase::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Owns the shell state and feeds it messages through `update`.
struct Shell {
    state: AppState,
    effects: EffectRunner,
    view: TerminalView,
}

impl Shell {
    fn new(state: AppState, effects: EffectRunner) -> Self {
        Self {
            state,
            effects,
            view: TerminalView::new(),
        }
    }

    fn phase(&self) -> Phase {
        self.state.phase()
    }

    fn dispatch(&mut self, msg: Msg) {
        press_debug!("dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;

        self.effects.enqueue(effects);
        if was_dirty {
            for line in self.view.render(&view) {
                println!("{line}");
            }
        }
    }
}
