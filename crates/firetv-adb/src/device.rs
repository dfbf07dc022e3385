//! State inference and command dispatch for a single Fire TV
//!
//! The device offers no playback API over adb, so [`FireTv::state`] combines
//! a handful of cheap probes, in a fixed order where each step outranks the
//! ones below it:
//!
//! ```text
//! no session                      -> disconnected
//! Display Power lacks state=ON    -> off
//! mWakefulness lacks Awake        -> idle       (screensaver)
//! launcher has focus              -> standby
//! Locks lacks size=0              -> playing    (someone holds a wake lock)
//! otherwise                       -> paused
//! ```
//!
//! Nothing is cached: every query costs fresh round-trips, so the answer
//! always reflects the device as it is now.

use futures_util::StreamExt;

use firetv_core::prelude::*;
use firetv_core::types::{INTENT_HOME, INTENT_LAUNCH};
use firetv_core::{
    dump_contains, parse_focused_window, parse_intent_output, parse_power_facts, process_name,
    Action, AppState, DeviceState, Endpoint, FocusedWindow, IntentResult, KeyAction, LineSplitter,
    PowerFacts, LAUNCHER_PACKAGE,
};

use crate::connection::{transport_error, ConnectOutcome, Connection};
use crate::transport::{Connector, Transport, TransportError};

/// Process owner prefix of user-installed apps in `ps` output
pub const DEFAULT_PROCESS_FILTER: &str = "u0_a";

/// Per-device knobs that vary between firmware versions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Package whose focus means "home screen"
    pub launcher_package: String,
    /// Substring selecting app processes in `ps` output
    pub process_filter: String,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            launcher_package: LAUNCHER_PACKAGE.to_string(),
            process_filter: DEFAULT_PROCESS_FILTER.to_string(),
        }
    }
}

/// One Fire TV reachable over adb
///
/// Operations take `&mut self`: an adb session must not interleave commands,
/// so concurrent callers need to serialize access (see the registry in
/// `firetv-app`, which wraps each device in a mutex).
#[derive(Debug)]
pub struct FireTv<C: Connector> {
    connection: Connection<C>,
    options: DeviceOptions,
}

impl<C: Connector> FireTv<C> {
    /// Create the device and attempt the first connection
    ///
    /// A refused connection still yields a device, in the disconnected state.
    pub async fn new(endpoint: Endpoint, connector: C, options: DeviceOptions) -> Result<Self> {
        let mut device = Self::detached(endpoint, connector, options);
        device.connect().await?;
        Ok(device)
    }

    /// Create the device without contacting it
    pub fn detached(endpoint: Endpoint, connector: C, options: DeviceOptions) -> Self {
        Self {
            connection: Connection::new(endpoint, connector),
            options,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.connection.endpoint()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Force a (re)connection attempt
    pub async fn connect(&mut self) -> Result<ConnectOutcome> {
        self.connection.connect().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shell primitives
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a command on the live session; `None` when there is none
    async fn shell(&mut self, command: &str) -> Result<Option<String>> {
        let result = match self.connection.current_session() {
            Some(session) => session.execute(command).await,
            None => {
                debug!("No session to {}, skipping: {}", self.endpoint(), command);
                return Ok(None);
            }
        };

        match result {
            Ok(output) => Ok(Some(output)),
            Err(e) => Err(self.fail(command, e).await),
        }
    }

    /// Recover what can be recovered after a transport failure and build the
    /// error reported for the interrupted command
    ///
    /// Only corruption replaces the session. Any other failure leaves it in
    /// place, so the next command goes through adb again.
    async fn fail(&mut self, command: &str, err: TransportError) -> Error {
        if err.is_corruption() {
            match self.connection.reconnect_after_corruption().await {
                Ok(outcome) => debug!("Reconnect after corruption: {:?}", outcome),
                Err(e) => warn!("Reconnect after corruption failed: {}", e),
            }
        }
        transport_error(self.connection.endpoint(), command, err)
    }

    /// `dumpsys <service>`, optionally narrowed with grep on the device
    async fn dump(&mut self, service: &str, grep: Option<&str>) -> Result<Option<String>> {
        let command = match grep {
            Some(pattern) => format!("dumpsys {} | grep \"{}\"", service, pattern),
            None => format!("dumpsys {}", service),
        };
        self.shell(&command).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State inference
    // ─────────────────────────────────────────────────────────────────────────

    /// Infer the current device state
    ///
    /// Never fails: a device that cannot be queried is `Disconnected`.
    pub async fn state(&mut self) -> DeviceState {
        match self.probe_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("State query for {} failed: {}", self.endpoint(), e);
                DeviceState::Disconnected
            }
        }
    }

    async fn probe_state(&mut self) -> Result<DeviceState> {
        if !self.is_connected() {
            return Ok(DeviceState::Disconnected);
        }

        let Some(display) = self.dump("power", Some("Display Power")).await? else {
            return Ok(DeviceState::Disconnected);
        };
        if !dump_contains(&display, "state=ON") {
            return Ok(DeviceState::Off);
        }

        let Some(wakefulness) = self.dump("power", Some("mWakefulness")).await? else {
            return Ok(DeviceState::Disconnected);
        };
        if !dump_contains(&wakefulness, "Awake") {
            return Ok(DeviceState::Idle);
        }

        let launcher = self.options.launcher_package.clone();
        if self
            .current_app()
            .await?
            .is_some_and(|window| window.is_launcher(&launcher))
        {
            return Ok(DeviceState::Standby);
        }

        let Some(locks) = self.dump("power", Some("Locks")).await? else {
            return Ok(DeviceState::Disconnected);
        };
        if !dump_contains(&locks, "size=0") {
            return Ok(DeviceState::Playing);
        }

        Ok(DeviceState::Paused)
    }

    /// Whether `package` is the foreground app
    ///
    /// Only the focused window is inspected; an app alive in the background
    /// reports `Off`.
    pub async fn app_state(&mut self, package: &str) -> AppState {
        if !self.state().await.is_on() {
            return AppState::Off;
        }

        match self.current_app().await {
            Ok(Some(window)) if window.package == package => AppState::On,
            Ok(_) => AppState::Off,
            Err(e) => {
                warn!("Focus query for {} failed: {}", self.endpoint(), e);
                AppState::Off
            }
        }
    }

    /// Package and activity of the focused window
    ///
    /// `Ok(None)` when disconnected or when the dump could not be parsed.
    pub async fn current_app(&mut self) -> Result<Option<FocusedWindow>> {
        let Some(raw) = self.dump("window windows", Some("mCurrentFocus")).await? else {
            return Ok(None);
        };

        let window = parse_focused_window(&raw);
        if window.is_none() {
            warn!("Couldn't get current app, reply was {:?}", raw);
        }
        Ok(window)
    }

    /// All power facts from a single full `dumpsys power`
    pub async fn power_facts(&mut self) -> Result<Option<PowerFacts>> {
        Ok(self
            .dump("power", None)
            .await?
            .map(|raw| parse_power_facts(&raw)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Command dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a key event; silently does nothing without a session
    pub async fn press(&mut self, key: KeyAction) -> Result<()> {
        debug!("Pressing {:?} on {}", key, self.endpoint());
        self.shell(&key.command()).await?;
        Ok(())
    }

    /// Run a named action
    pub async fn perform(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Key(key) => self.press(key).await,
            Action::TurnOn => self.turn_on().await,
            Action::TurnOff => self.turn_off().await,
        }
    }

    /// Press power only if the device is off
    pub async fn turn_on(&mut self) -> Result<()> {
        if self.state().await == DeviceState::Off {
            self.press(KeyAction::Power).await?;
        }
        Ok(())
    }

    /// Press power only if the device is not off
    pub async fn turn_off(&mut self) -> Result<()> {
        if self.state().await != DeviceState::Off {
            self.press(KeyAction::Power).await?;
        }
        Ok(())
    }

    /// Start `package` through its launcher intent
    pub async fn launch_app(&mut self, package: &str) -> Result<Option<IntentResult>> {
        self.send_intent(package, INTENT_LAUNCH, 1).await
    }

    /// "Stop" an app by bringing up the home screen
    ///
    /// `package` is never addressed; stopping any app is the same as Home.
    pub async fn stop_app(&mut self, package: &str) -> Result<Option<IntentResult>> {
        debug!("Stopping \"{}\" by going home", package);
        let launcher = self.options.launcher_package.clone();
        self.send_intent(&launcher, INTENT_HOME, 1).await
    }

    async fn send_intent(
        &mut self,
        package: &str,
        intent: &str,
        count: u32,
    ) -> Result<Option<IntentResult>> {
        debug!(
            "Sending intent {} to {} (count: {})",
            intent, package, count
        );
        let command = format!("monkey -p {} -c {} {}; echo $?", package, intent, count);

        match self.shell(&command).await? {
            Some(raw) => parse_intent_output(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Names of running user apps, per the configured process filter
    pub async fn running_apps(&mut self) -> Result<Option<Vec<String>>> {
        let filter = self.options.process_filter.clone();
        self.running_processes(&filter).await
    }

    /// Process names from a streamed `ps` whose line contains `filter`
    ///
    /// Order and duplicates follow the device listing. A corrupted stream
    /// triggers one reconnect and fails the call; partial listings are
    /// never returned.
    pub async fn running_processes(&mut self, filter: &str) -> Result<Option<Vec<String>>> {
        let opened = match self.connection.current_session() {
            Some(session) => session.execute_streaming("ps").await,
            None => return Ok(None),
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Err(self.fail("ps", e).await),
        };

        let mut splitter = LineSplitter::new();
        let mut names = Vec::new();
        let mut keep = |line: &str| {
            if line.contains(filter) {
                if let Some(name) = process_name(line) {
                    names.push(name.to_string());
                }
            }
        };

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in splitter.push(&chunk) {
                        keep(&line);
                    }
                }
                Err(e) => {
                    drop(stream);
                    return Err(self.fail("ps", e).await);
                }
            }
        }
        if let Some(tail) = splitter.finish() {
            keep(&tail);
        }

        trace!("Running processes matching {:?}: {:?}", filter, names);
        Ok(Some(names))
    }
}
