//! Decision point for toolchain failures during an initial compile.

use super::compiled::ShaderDesc;

/// What to do after an initial compile fails in the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Run the full compile again (the user may have fixed the file).
    Retry,
    /// Give up; the request fails with `ShaderError::Aborted`.
    Abort,
}

/// Consulted once per failed attempt of an initial compile.
///
/// An interactive app can prompt the user here and block until they either
/// fix the shader and retry, or cancel.
pub trait CompileErrorHandler: Send + Sync {
    fn on_toolchain_error(&self, shader: &ShaderDesc, diagnostic: &str) -> ErrorAction;
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnError;

impl CompileErrorHandler for AbortOnError {
    fn on_toolchain_error(&self, _shader: &ShaderDesc, _diagnostic: &str) -> ErrorAction {
        ErrorAction::Abort
    }
}

impl<F> CompileErrorHandler for F
where
    F: Fn(&ShaderDesc, &str) -> ErrorAction + Send + Sync,
{
    fn on_toolchain_error(&self, shader: &ShaderDesc, diagnostic: &str) -> ErrorAction {
        self(shader, diagnostic)
    }
}
