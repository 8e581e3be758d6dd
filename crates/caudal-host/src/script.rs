//! Script loading: feeding graph-building statements to an interpreter.

use crate::{Engine, Error, Result};
use caudal_core::Server;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// Executes one graph-building statement against the server.
///
/// The host supplies the statement language; the engine only delivers
/// statements and reports failures. An implementation typically parses
/// constructor calls and registers the resulting nodes by name.
pub trait StatementInterpreter {
    /// Runs one statement. An `Err` carries a diagnostic for the caller;
    /// it must not leave the server in a torn state.
    fn exec(&mut self, server: &mut Server, statement: &str) -> std::result::Result<(), String>;
}

impl Engine {
    /// Executes one statement.
    pub fn exec_statement(
        &self,
        interpreter: &mut dyn StatementInterpreter,
        statement: &str,
    ) -> Result<()> {
        let mut server = self.lock();
        interpreter
            .exec(&mut server, statement)
            .map_err(|message| Error::Script { line: 1, message })
    }

    /// Loads a script file and executes it statement by statement.
    ///
    /// One statement per line; blank lines and `#` comments are skipped.
    /// A non-additive load clears the current graph first. Stops at the
    /// first rejected statement, reporting its line number; the statements
    /// before it have already taken effect.
    pub fn load_script(
        &self,
        interpreter: &mut dyn StatementInterpreter,
        path: &Path,
        additive: bool,
    ) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        info!(path = %path.display(), additive, "loading script");

        let mut server = self.lock();
        if !additive {
            server.clear();
        }
        for (lineno, line) in text.lines().enumerate() {
            let statement = line.trim();
            if statement.is_empty() || statement.starts_with('#') {
                continue;
            }
            if let Err(message) = interpreter.exec(&mut server, statement) {
                let line = lineno + 1;
                warn!(path = %path.display(), line, message, "script statement rejected");
                return Err(Error::Script { line, message });
            }
        }
        Ok(())
    }
}
