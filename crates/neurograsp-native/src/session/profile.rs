//! Profile manager.
//!
//! Tracks the wanted profile and the most recent list the source reported, and
//! issues profile requests. Every request is fire-and-forget; its completion
//! comes back through [`crate::cortex::CortexEvent`] and is handled by the
//! session controller, which also guarantees only one profile operation is in
//! flight at a time.

use neurograsp_core::types::ProfileOp;

use crate::cortex::{ClientResult, StreamingClient};

/// Whether a profile name is known to the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfileResolution {
    /// Present in the last discovered list
    pub exists: bool,
}

/// Wanted profile plus the last discovered profile list.
#[derive(Clone, Debug, Default)]
pub struct ProfileManager {
    wanted: Option<String>,
    discovered: Vec<String>,
}

impl ProfileManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile the session is working towards.
    #[must_use]
    pub fn wanted(&self) -> Option<&str> {
        self.wanted.as_deref()
    }

    /// Record the profile to load.
    pub fn set_wanted(&mut self, name: impl Into<String>) {
        self.wanted = Some(name.into());
    }

    /// Forget the wanted profile after an unload.
    pub fn clear_wanted(&mut self) {
        self.wanted = None;
    }

    /// Profiles from the last query, in source order without duplicates.
    #[must_use]
    pub fn discovered(&self) -> &[String] {
        &self.discovered
    }

    /// Replace the discovered list.
    pub fn record_discovered(&mut self, profiles: Vec<String>) {
        self.discovered.clear();
        for name in profiles {
            if !self.discovered.contains(&name) {
                self.discovered.push(name);
            }
        }
        tracing::debug!("Discovered {} profiles", self.discovered.len());
    }

    /// Check a name against the discovered list.
    #[must_use]
    pub fn resolve(&self, name: &str) -> ProfileResolution {
        ProfileResolution {
            exists: self.discovered.iter().any(|p| p == name),
        }
    }

    /// Request the full profile list.
    pub fn query_all<C: StreamingClient + ?Sized>(&self, client: &mut C) -> ClientResult<()> {
        client.query_profiles()
    }

    /// Request the current profile; the source loads the wanted one.
    pub fn get_current<C: StreamingClient + ?Sized>(&self, client: &mut C) -> ClientResult<()> {
        client.get_current_profile()
    }

    /// Request a load.
    pub fn load<C: StreamingClient + ?Sized>(&self, client: &mut C, name: &str) -> ClientResult<()> {
        client.setup_profile(name, ProfileOp::Load)
    }

    /// Request an unload.
    pub fn unload<C: StreamingClient + ?Sized>(&self, client: &mut C, name: &str) -> ClientResult<()> {
        client.setup_profile(name, ProfileOp::Unload)
    }

    /// Request a save.
    pub fn save<C: StreamingClient + ?Sized>(&self, client: &mut C, name: &str) -> ClientResult<()> {
        client.setup_profile(name, ProfileOp::Save)
    }

    /// Request a create.
    pub fn create<C: StreamingClient + ?Sized>(&self, client: &mut C, name: &str) -> ClientResult<()> {
        client.setup_profile(name, ProfileOp::Create)
    }

    /// Load `name` through get-current-profile if it exists, else create it.
    ///
    /// Exactly one request is sent either way.
    pub fn load_or_create<C: StreamingClient + ?Sized>(
        &self,
        client: &mut C,
        name: &str,
    ) -> ClientResult<ProfileResolution> {
        let resolution = self.resolve(name);
        if resolution.exists {
            tracing::info!("Profile '{}' exists, loading", name);
            self.get_current(client)?;
        } else {
            tracing::info!("Profile '{}' not found, creating", name);
            self.create(client, name)?;
        }
        Ok(resolution)
    }
}
