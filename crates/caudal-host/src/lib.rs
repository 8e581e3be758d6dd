//! Host-embedding boundary for the caudal DSP engine.
//!
//! This crate wraps a [`caudal_core::Server`] behind the narrow surface an
//! embedding host (audio callback, firmware loop, plugin shell) talks to:
//!
//! - **Audio exchange**: [`Engine::fill_input`] and [`Engine::process`]
//!   translate between interleaved host buffers and the engine's planar
//!   stream layout, including the double-rate pair layout used by
//!   8-channel boards.
//! - **Analog/control lines**: [`Engine::fill_analog`] and
//!   [`Engine::analog_out`] carry the trailing channels symmetrically.
//! - **Scripting**: [`Engine::load_script`] and [`Engine::exec_statement`]
//!   feed graph-building statements to a caller-supplied
//!   [`StatementInterpreter`], never panicking on bad input.
//! - **Control**: [`Engine::set_value`], [`Engine::set_attribute`] and
//!   [`Engine::push_midi_event`] for live parameter and MIDI traffic.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use caudal_host::Engine;
//!
//! let engine = Engine::setup(2, 64, 48000.0, 0);
//! // in the audio callback:
//! engine.fill_input(&host_in)?;
//! engine.process(&mut host_out)?;
//! ```

mod engine;
mod script;

pub use engine::Engine;
pub use script::StatementInterpreter;

use std::path::PathBuf;

/// Installs a process-wide tracing subscriber filtered by `RUST_LOG`.
///
/// Call once at host startup; later calls are no-ops. Embedded hosts with
/// their own subscriber skip this and install theirs instead.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Error types for the host boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The script file does not exist.
    #[error("script file not found: {0}")]
    FileNotFound(PathBuf),

    /// A script statement was rejected by the interpreter.
    #[error("script error at line {line}: {message}")]
    Script {
        /// One-based line number within the script.
        line: usize,
        /// Interpreter diagnostic.
        message: String,
    },

    /// An attribute path did not have the `name.attribute` shape.
    #[error("malformed attribute path {0:?}, expected \"name.attribute\"")]
    AttributePath(String),

    /// A host buffer had the wrong sample count for the configured layout.
    #[error("host buffer holds {got} samples, expected {expected}")]
    BufferLayout {
        /// Samples the configured layout requires.
        expected: usize,
        /// Samples the host handed over.
        got: usize,
    },

    /// The engine rejected a control operation.
    #[error("engine error: {0}")]
    Engine(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<caudal_core::ServerError> for Error {
    fn from(e: caudal_core::ServerError) -> Self {
        Error::Engine(e.to_string())
    }
}

/// Convenience result type for host boundary operations.
pub type Result<T> = std::result::Result<T, Error>;
