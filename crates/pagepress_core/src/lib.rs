//! PagePress core: conversion request and outcome model plus the pure
//! state machine behind the presentation shell.
mod callback;
mod config;
mod effect;
mod error;
mod msg;
mod outcome;
mod state;
mod update;
mod validate;
mod view_model;

pub use callback::{deliver, ConversionCallback};
pub use config::{
    default_file_name, ConversionConfig, ConversionConfigBuilder, DEFAULT_FILE_PREFIX,
    DEFAULT_STORAGE_PATH, DEFAULT_TIMEOUT_MILLIS, DEFAULT_USER_AGENT,
};
pub use effect::Effect;
pub use error::{BoxError, ConvertError, FailureStep};
pub use msg::Msg;
pub use outcome::{ContentUri, Failure, Locator, Outcome, Progress, Success};
pub use state::{AppState, Phase, RequestParams, ShellDefaults};
pub use update::update;
pub use validate::{validate_config, validate_url, ACCEPTED_SCHEMES};
pub use view_model::AppViewModel;
