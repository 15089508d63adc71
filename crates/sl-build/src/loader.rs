//! Reading document text, with optional per-extension preprocessing.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;

use tracing::debug;

use crate::error::LoadError;

/// A text transform applied to documents before they reach the compiler.
///
/// Receives the document path and its raw text, and returns the text to
/// compile. Closures `Fn(&Path, &str) -> Result<String, String>` implement it.
pub trait Preprocessor {
    /// Transform `text`, read from `path`.
    fn process(&self, path: &Path, text: &str) -> Result<String, String>;
}

impl<F> Preprocessor for F
where
    F: Fn(&Path, &str) -> Result<String, String>,
{
    fn process(&self, path: &Path, text: &str) -> Result<String, String> {
        self(path, text)
    }
}

/// Preprocessor that pipes the document through an external command.
///
/// The raw text is written to the command's stdin and its stdout is used as
/// the document text. The document path is passed in the `LOOM_SOURCE`
/// environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPreprocessor {
    program: String,
    args: Vec<String>,
}

impl CommandPreprocessor {
    /// Create a preprocessor running `program` with `args`.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    fn run(&self, path: &Path, text: &str) -> io::Result<std::process::Output> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("LOOM_SOURCE", path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from its own thread so a command that streams output
        // cannot block on a full stdout pipe while we are still writing.
        let stdin = child.stdin.take();
        let bytes = text.as_bytes().to_vec();
        let writer = thread::spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(&bytes),
            None => Ok(()),
        });

        let output = child.wait_with_output()?;
        match writer.join() {
            // A command may exit without reading all of its input.
            Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
            Err(_) => Err(io::Error::other("stdin writer panicked")),
            _ => Ok(output),
        }
    }
}

impl Preprocessor for CommandPreprocessor {
    fn process(&self, path: &Path, text: &str) -> Result<String, String> {
        let output = self
            .run(path, text)
            .map_err(|e| format!("cannot run `{}`: {e}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "`{}` exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }
        String::from_utf8(output.stdout)
            .map_err(|_| format!("`{}` produced invalid UTF-8", self.program))
    }
}

/// Reads documents from disk and applies the preprocessor registered for
/// their extension.
#[derive(Default)]
pub struct SourceLoader {
    engines: BTreeMap<String, Box<dyn Preprocessor>>,
}

impl fmt::Debug for SourceLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceLoader")
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SourceLoader {
    /// Create a loader without preprocessors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `engine` for files ending in `.{extension}`.
    ///
    /// A later registration for the same extension replaces the earlier one.
    pub fn with_engine(mut self, extension: impl Into<String>, engine: impl Preprocessor + 'static) -> Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.').to_string();
        self.engines.insert(extension, Box::new(engine));
        self
    }

    /// Returns `true` if a preprocessor handles `path`.
    pub fn has_engine_for(&self, path: &Path) -> bool {
        self.engine_for(path).is_some()
    }

    /// Read `path`, preprocessing it if an engine matches its extension.
    pub fn load(&self, path: &Path) -> Result<String, LoadError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Access {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let Some(engine) = self.engine_for(path) else {
            return Ok(raw);
        };

        debug!(path = %path.display(), "preprocessing");
        engine.process(path, &raw).map_err(|message| LoadError::Transform {
            path: path.to_path_buf(),
            message,
        })
    }

    fn engine_for(&self, path: &Path) -> Option<&dyn Preprocessor> {
        let extension = path.extension()?.to_str()?;
        self.engines.get(extension).map(Box::as_ref)
    }
}
