use std::mem::discriminant;

use tracing::{debug, info, trace, warn};

use crate::window_api::{ActiveWindowData, WindowError, WindowManager};

/// Reads the foreground window once per tick. Never fails: anything the OS refuses to tell us
/// becomes [ActiveWindowData::unknown].
pub struct WindowSampler {
    manager: Box<dyn WindowManager + Send>,
    last_failure: Option<WindowError>,
}

impl WindowSampler {
    pub fn new(manager: Box<dyn WindowManager + Send>) -> Self {
        Self {
            manager,
            last_failure: None,
        }
    }

    pub fn sample(&mut self) -> ActiveWindowData {
        match self.manager.get_active_window_data() {
            Ok(window) => {
                if let Some(failure) = self.last_failure.take() {
                    info!("Foreground window readable again after: {failure}");
                }
                window
            }
            Err(e) => {
                self.report(e);
                ActiveWindowData::unknown()
            }
        }
    }

    /// Logs each kind of failure once when it starts, so a denied permission stays visible
    /// without flooding the log every second.
    fn report(&mut self, error: WindowError) {
        let repeated = self
            .last_failure
            .as_ref()
            .is_some_and(|last| discriminant(last) == discriminant(&error));
        if repeated {
            trace!("Sampling still failing: {error}");
        } else {
            match &error {
                WindowError::NoForegroundWindow => debug!("No foreground window to sample"),
                WindowError::AccessDenied(reason) => {
                    warn!("Not allowed to inspect the foreground window: {reason}")
                }
                WindowError::Os(e) => warn!("Failed to sample the foreground window {e:?}"),
            }
        }
        self.last_failure = Some(error);
    }
}
