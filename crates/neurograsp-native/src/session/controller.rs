//! Session controller.
//!
//! Every transition runs inside the delivery of one event and sends at most
//! one request. Events that do not fit the current state are logged and
//! dropped.

use neurograsp_core::sensitivity::SensitivityPlan;
use neurograsp_core::translator::{Classification, CommandTranslator, ThresholdSource};
use neurograsp_core::types::{CommandEvent, DataStream};

use crate::bridge::CommandSink;
use crate::cortex::{ClientResult, CortexEvent, ErrorKind, ErrorReport, SensitivityResult, StreamingClient};

use super::profile::ProfileManager;
use super::sensitivity::SensitivityConfigurator;
use super::{SessionError, SessionResult, SessionState, SessionStats};

/// Drives a streaming client from session open to subscribed command data,
/// then forwards triggering events to a command sink.
pub struct SessionController<C, S, T> {
    client: C,
    sink: S,
    threshold: T,
    translator: CommandTranslator,
    profiles: ProfileManager,
    sensitivity: SensitivityConfigurator,
    device: Option<String>,
    state: SessionState,
    stats: SessionStats,
}

impl<C, S, T> SessionController<C, S, T>
where
    C: StreamingClient,
    S: CommandSink,
    T: ThresholdSource,
{
    /// Create an idle controller with the default translator and plan.
    pub fn new(client: C, sink: S, threshold: T) -> Self {
        Self {
            client,
            sink,
            threshold,
            translator: CommandTranslator::default(),
            profiles: ProfileManager::new(),
            sensitivity: SensitivityConfigurator::default(),
            device: None,
            state: SessionState::Idle,
            stats: SessionStats::default(),
        }
    }

    /// Replace the event translator.
    #[must_use]
    pub fn with_translator(mut self, translator: CommandTranslator) -> Self {
        self.translator = translator;
        self
    }

    /// Replace the sensitivity plan.
    #[must_use]
    pub fn with_sensitivity_plan(mut self, plan: SensitivityPlan) -> Self {
        self.sensitivity = SensitivityConfigurator::new(plan);
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Wanted profile, if any.
    pub fn profile(&self) -> Option<&str> {
        self.profiles.wanted()
    }

    /// Wanted headset, if any.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Profile manager state.
    pub fn profiles(&self) -> &ProfileManager {
        &self.profiles
    }

    /// Streaming client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Command sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Take the client and sink back.
    pub fn into_parts(self) -> (C, S) {
        (self.client, self.sink)
    }

    /// Start a session for `profile` on an optional headset.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidArgument`] for an empty profile name
    /// - [`SessionError::InvalidState`] unless idle
    /// - [`SessionError::Client`] if the open request fails
    pub fn start(&mut self, profile: &str, device: Option<&str>) -> SessionResult<()> {
        if profile.is_empty() {
            return Err(SessionError::InvalidArgument(
                "profile name cannot be empty".to_string(),
            ));
        }
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }

        self.profiles.set_wanted(profile);
        self.sensitivity.clear_active_actions();
        self.device = device.filter(|d| !d.is_empty()).map(str::to_string);

        let result = self.client.open_session(profile, self.device.as_deref());
        self.settle(result.map(|()| SessionState::SessionOpen))
    }

    /// Unload the wanted profile. The session returns to idle once the
    /// source confirms.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidState`] unless subscribed, or
    /// [`SessionError::Client`] if the request fails.
    pub fn unload_profile(&mut self) -> SessionResult<()> {
        let profile = match (self.state, self.profiles.wanted()) {
            (SessionState::Subscribed, Some(profile)) => profile.to_string(),
            (state, _) => {
                return Err(SessionError::InvalidState {
                    operation: "unload profile",
                    state,
                })
            }
        };

        let result = self.profiles.unload(&mut self.client, &profile);
        self.settle(result.map(|()| SessionState::ProfileLoading))
    }

    /// Feed one event from the source.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Client`] if the follow-up request fails; the
    /// session is then [`SessionState::Errored`].
    pub fn handle(&mut self, event: CortexEvent) -> SessionResult<()> {
        let next = self.step(event);
        self.settle(next)
    }

    fn settle(&mut self, next: ClientResult<SessionState>) -> SessionResult<()> {
        match next {
            Ok(state) => {
                self.transition(state);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Request failed in {}: {}", self.state, e);
                self.transition(SessionState::Errored);
                Err(e.into())
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if next != self.state {
            tracing::info!("Session {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn wanted(&self) -> String {
        self.profiles.wanted().unwrap_or_default().to_string()
    }

    fn step(&mut self, event: CortexEvent) -> ClientResult<SessionState> {
        use SessionState as State;

        match (self.state, event) {
            (_, CortexEvent::SessionClosed) => {
                tracing::info!("Session closed by source");
                Ok(State::Disconnected)
            }

            (state, CortexEvent::InformError(report)) if !state.is_terminal() => self.on_error(&report),

            (State::SessionOpen, CortexEvent::SessionCreated) => {
                self.profiles.query_all(&mut self.client)?;
                Ok(State::ProfileResolving)
            }

            (State::ProfileResolving, CortexEvent::ProfileQueryDone { profiles }) => {
                self.profiles.record_discovered(profiles);
                let wanted = self.wanted();
                self.profiles.load_or_create(&mut self.client, &wanted)?;
                Ok(State::ProfileLoading)
            }

            (State::ProfileLoading, CortexEvent::LoadUnloadDone { loaded: true }) => {
                let wanted = self.wanted();
                tracing::info!("Profile '{}' loaded", wanted);
                self.sensitivity.clear_active_actions();
                self.client.get_active_actions(&wanted)?;
                Ok(State::SensitivityReading)
            }

            (State::ProfileLoading, CortexEvent::LoadUnloadDone { loaded: false }) => {
                tracing::info!("Profile '{}' unloaded", self.wanted());
                self.profiles.clear_wanted();
                self.sensitivity.clear_active_actions();
                Ok(State::Idle)
            }

            (State::SensitivityReading, CortexEvent::ActiveActionsDone { actions }) => {
                self.sensitivity.record_active_actions(actions);
                let wanted = self.wanted();
                self.sensitivity.read(&mut self.client, &wanted)?;
                Ok(State::SensitivityReading)
            }

            (State::SensitivityReading, CortexEvent::SensitivityDone(SensitivityResult::Read(current)))
                if self.sensitivity.has_active_actions() =>
            {
                let wanted = self.wanted();
                match self.sensitivity.next_vector(&current) {
                    Ok(vector) => {
                        self.sensitivity.write(&mut self.client, &wanted, &vector)?;
                        Ok(State::SensitivityWriting)
                    }
                    Err(e) => {
                        tracing::warn!("Keeping sensitivity {:?}: {}", current, e);
                        self.profiles.save(&mut self.client, &wanted)?;
                        Ok(State::ProfileSaving)
                    }
                }
            }

            (
                State::SensitivityReading | State::SensitivityWriting,
                CortexEvent::SensitivityDone(SensitivityResult::WriteAck),
            ) => {
                let wanted = self.wanted();
                self.profiles.save(&mut self.client, &wanted)?;
                Ok(State::ProfileSaving)
            }

            (State::ProfileSaving, CortexEvent::SaveDone) => {
                tracing::info!("Profile '{}' saved", self.wanted());
                self.client.subscribe(&[DataStream::MentalCommand])?;
                Ok(State::Subscribed)
            }

            (State::Subscribed, CortexEvent::CommandData(event)) => {
                self.on_command(&event);
                Ok(State::Subscribed)
            }

            (state, event) => {
                tracing::warn!("Ignoring {:?} while {}", event, state);
                Ok(state)
            }
        }
    }

    fn on_error(&mut self, report: &ErrorReport) -> ClientResult<SessionState> {
        tracing::error!("Source error {}: {}", report.code, report.message);

        if report.kind() == ErrorKind::ProfileAccessDenied {
            tracing::warn!("Profile access denied, disconnecting headset for next use");
            self.client.disconnect_device()?;
        }
        Ok(SessionState::Errored)
    }

    fn on_command(&mut self, event: &CommandEvent) {
        self.stats.events += 1;
        let threshold = self.threshold.current();

        match self.translator.classify(event, threshold) {
            Classification::Trigger(action) => {
                self.stats.triggers += 1;
                tracing::info!(
                    "Trigger '{}' at power {:.2} (threshold {:.2})",
                    action,
                    event.power,
                    threshold.value()
                );
                if let Err(e) = self.sink.dispatch(self.translator.command().clone()) {
                    self.stats.dispatch_failures += 1;
                    tracing::warn!("Command not dispatched: {}", e);
                }
            }
            Classification::Suppress => {
                self.stats.suppressed += 1;
                tracing::debug!("{} at power {:.2}", event.action, event.power);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
