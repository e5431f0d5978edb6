use crate::{AppState, Effect, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::RequestReceived(params) => {
            state.apply_request(params);
            Vec::new()
        }
        Msg::UrlChanged(url) => {
            state.set_url(url);
            Vec::new()
        }
        Msg::FileNameChanged(name) => {
            state.set_file_name(name);
            Vec::new()
        }
        Msg::StoragePathChanged(path) => {
            state.set_storage_path(path);
            Vec::new()
        }
        Msg::ConvertClicked => {
            // One conversion at a time per shell; the button is disabled meanwhile.
            if state.phase() == Phase::Converting {
                return (state, Vec::new());
            }
            let config = state.build_config();
            state.start_conversion();
            vec![Effect::StartConversion(config)]
        }
        Msg::ConversionProgress { message } => {
            if state.phase() == Phase::Converting {
                state.apply_progress(message);
            }
            Vec::new()
        }
        Msg::ConversionSucceeded { locator, message } => {
            if state.phase() == Phase::Converting {
                state.apply_success(locator, message);
            }
            Vec::new()
        }
        Msg::ConversionFailed { message } => {
            if state.phase() == Phase::Converting {
                state.apply_failure(message);
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
