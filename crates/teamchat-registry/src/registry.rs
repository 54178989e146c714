//! The team registry: the in-memory map plus its write-through store.

use chrono::Utc;
use rand::Rng;
use teamchat_protocol::{Team, TeamCode, TeamMap};

use crate::{RegistryError, TeamStore};

/// Characters used in generated codes. `0`/`O`, `1`/`I`/`L` are left out
/// so codes survive being read aloud or copied by hand.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of a generated team code.
pub const CODE_LEN: usize = 6;

/// Durable mapping from team code to [`Team`].
///
/// Owned by the chat service; there is exactly one per running server.
/// Entries are only ever added.
pub struct TeamRegistry {
    teams: TeamMap,
    store: Box<dyn TeamStore>,
}

impl TeamRegistry {
    /// Loads every team from `store` and returns a registry that writes
    /// back to it.
    ///
    /// # Errors
    /// Whatever the store's `load` returns: an unreadable or corrupt
    /// document is a startup failure, not something to paper over.
    pub fn open(store: impl TeamStore) -> Result<Self, RegistryError> {
        let teams = store.load()?;
        tracing::info!(teams = teams.len(), "team registry loaded");
        Ok(Self {
            teams,
            store: Box::new(store),
        })
    }

    /// Registers a new team and returns its code.
    ///
    /// With a custom code, the code is trimmed and uppercased and must
    /// not exist yet. A custom code that is blank after trimming is
    /// rejected rather than replaced.
    /// Without one, a random code is drawn from [`CODE_ALPHABET`] until
    /// an unused one comes up.
    ///
    /// The full map is saved before returning. A failed save is logged
    /// and the new team stays registered in memory.
    ///
    /// # Errors
    /// [`RegistryError::BlankCode`] if the custom code is empty after
    /// trimming, [`RegistryError::CodeConflict`] if it is taken.
    pub fn create(
        &mut self,
        custom_code: Option<&str>,
    ) -> Result<TeamCode, RegistryError> {
        let code = match custom_code {
            Some(raw) => {
                let code = TeamCode::normalize(raw).ok_or(RegistryError::BlankCode)?;
                if self.teams.contains_key(&code) {
                    return Err(RegistryError::CodeConflict(code));
                }
                code
            }
            None => self.unused_code(),
        };

        let team = Team {
            code: code.clone(),
            created_at: Utc::now(),
        };
        self.teams.insert(code.clone(), team);
        tracing::info!(team = %code, teams = self.teams.len(), "team created");

        self.persist();
        Ok(code)
    }

    /// Looks up a team by user-supplied code (normalized first).
    pub fn lookup(&self, code: &str) -> Option<&Team> {
        TeamCode::normalize(code).and_then(|code| self.teams.get(&code))
    }

    /// Looks up a team by an already-normalized code.
    pub fn get(&self, code: &TeamCode) -> Option<&Team> {
        self.teams.get(code)
    }

    /// Returns every registered team, ordered by code.
    pub fn list_all(&self) -> &TeamMap {
        &self.teams
    }

    /// Number of registered teams.
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Returns `true` if no team has been registered.
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    fn unused_code(&self) -> TeamCode {
        let mut rng = rand::rng();
        loop {
            let code = generate_code(&mut rng);
            if !self.teams.contains_key(&code) {
                return code;
            }
            tracing::debug!(team = %code, "generated code collided, retrying");
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.teams) {
            tracing::error!(
                error = %e,
                teams = self.teams.len(),
                "failed to persist team registry, keeping in-memory entry"
            );
        }
    }
}

/// Draws a random [`CODE_LEN`]-character code from [`CODE_ALPHABET`].
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> TeamCode {
    let code: String = (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CODE_ALPHABET.len());
            CODE_ALPHABET[idx] as char
        })
        .collect();
    TeamCode::new(code)
}

// =========================================================================
// Tests
// =========================================================================
