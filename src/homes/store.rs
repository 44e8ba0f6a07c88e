use crate::entities::player::{ActorState, PlayerId, Profile};
use crate::entities::rank::RankTable;
use crate::homes::eligibility::{self, Reason};
use crate::persistence::store::HomeRecord;
use crate::persistence::worker::{HomeStorage, StorageEvent, StorageJob};
use crate::telemetry::logging;
use crate::world::position::Position;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Home {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Profile record not available yet; retry later.
    Deferred,
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Deferred => write!(f, "profile not available yet"),
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddError {
    NotLoaded,
    InvalidName,
    DuplicateName(String),
    IneligibleState(Reason),
    CapacityExceeded { limit: usize },
}

impl std::fmt::Display for AddError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddError::NotLoaded => write!(f, "your homes are still loading, try again in a moment."),
            AddError::InvalidName => write!(f, "a home needs a name."),
            AddError::DuplicateName(name) => {
                write!(f, "the home with the name \"{}\" already exists.", name)
            }
            AddError::IneligibleState(reason) => {
                write!(f, "cannot create homepoint ({}).", reason)
            }
            AddError::CapacityExceeded { limit } => write!(
                f,
                "unable to set your home here, you have reached the maximum of {} home{}!",
                limit,
                if *limit == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::error::Error for AddError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveError {
    NotLoaded,
    NotFound(String),
}

impl std::fmt::Display for RemoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoveError::NotLoaded => {
                write!(f, "your homes are still loading, try again in a moment.")
            }
            RemoveError::NotFound(name) => {
                write!(f, "the home with the name \"{}\" does not exist.", name)
            }
        }
    }
}

impl std::error::Error for RemoveError {}

/// What a drained storage completion did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { player: PlayerId, count: usize },
    Failed { player: PlayerId, detail: String },
    Stale { player: PlayerId },
    WriteFailed { user_id: u32, detail: String },
}

#[derive(Debug)]
enum Slot {
    Loading { generation: u64, user_id: u32 },
    Ready { user_id: u32, homes: Vec<Home> },
}

/// In-memory home sets of connected players, written through to durable storage.
///
/// A player's set is only visible once its initial load completed; every
/// operation before that is rejected.
pub struct HomeStore<S> {
    storage: S,
    ranks: RankTable,
    players: HashMap<PlayerId, Slot>,
    next_generation: u64,
}

impl<S: HomeStorage> HomeStore<S> {
    pub fn new(storage: S, ranks: RankTable) -> Self {
        Self {
            storage,
            ranks,
            players: HashMap::new(),
            next_generation: 1,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn ranks(&self) -> &RankTable {
        &self.ranks
    }

    /// Start loading `player`'s homes, replacing whatever was in memory.
    pub fn load(&mut self, player: PlayerId, profile: Option<&Profile>) -> Result<(), LoadError> {
        let profile = profile.ok_or(LoadError::Deferred)?;
        self.unload(player);
        let generation = self.next_generation;
        self.next_generation += 1;
        self.players.insert(
            player,
            Slot::Loading {
                generation,
                user_id: profile.id,
            },
        );
        self.storage.submit(StorageJob::Query {
            player,
            generation,
            user_id: profile.id,
        });
        Ok(())
    }

    /// Apply storage completions; returns what happened for logging and UI refresh.
    pub fn pump(&mut self) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        for event in self.storage.drain() {
            let outcome = match event {
                StorageEvent::Loaded {
                    player,
                    generation,
                    user_id,
                    result,
                } => self.complete_load(player, generation, user_id, result),
                StorageEvent::WriteFailed { user_id, detail } => {
                    LoadOutcome::WriteFailed { user_id, detail }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    fn complete_load(
        &mut self,
        player: PlayerId,
        generation: u64,
        user_id: u32,
        result: Result<Vec<HomeRecord>, String>,
    ) -> LoadOutcome {
        let current = match self.players.get(&player) {
            Some(Slot::Loading {
                generation: pending,
                ..
            }) => *pending == generation,
            _ => false,
        };
        if !current {
            return LoadOutcome::Stale { player };
        }
        let records = match result {
            Ok(records) => records,
            Err(detail) => {
                self.players.remove(&player);
                logging::log_error(&format!(
                    "loading homes for [{}:{}] failed: {}",
                    user_id, player, detail
                ));
                return LoadOutcome::Failed { player, detail };
            }
        };
        let mut homes: Vec<Home> = Vec::with_capacity(records.len());
        for record in records {
            if homes.iter().any(|home| home.name == record.name) {
                logging::log_error(&format!(
                    "duplicate home \"{}\" for [{}:{}] ignored",
                    record.name, user_id, player
                ));
                continue;
            }
            let position = record.position();
            homes.push(Home {
                name: record.name,
                position,
            });
        }
        let count = homes.len();
        self.players.insert(player, Slot::Ready { user_id, homes });
        logging::log_homes(&format!(
            "Loaded {} home(s) for [{}:{}]",
            count, user_id, player
        ));
        LoadOutcome::Loaded { player, count }
    }

    /// Forget the in-memory set; durable storage is untouched.
    pub fn unload(&mut self, player: PlayerId) {
        self.players.remove(&player);
    }

    pub fn is_loaded(&self, player: PlayerId) -> bool {
        matches!(self.players.get(&player), Some(Slot::Ready { .. }))
    }

    pub fn is_loading(&self, player: PlayerId) -> bool {
        matches!(self.players.get(&player), Some(Slot::Loading { .. }))
    }

    pub fn add(
        &mut self,
        player: PlayerId,
        name: &str,
        position: Position,
        actor: &ActorState,
        profile: &Profile,
    ) -> Result<(), AddError> {
        let limit = self.ranks.max_homes(profile);
        let Some(Slot::Ready { user_id, homes }) = self.players.get_mut(&player) else {
            return Err(AddError::NotLoaded);
        };
        if name.trim().is_empty() {
            return Err(AddError::InvalidName);
        }
        if homes.iter().any(|home| home.name == name) {
            return Err(AddError::DuplicateName(name.to_string()));
        }
        if let Some(reason) = eligibility::can_teleport_from(actor) {
            return Err(AddError::IneligibleState(reason));
        }
        if homes.len() >= limit {
            return Err(AddError::CapacityExceeded { limit });
        }

        homes.push(Home {
            name: name.to_string(),
            position,
        });
        let user_id = *user_id;
        self.storage.submit(StorageJob::Insert {
            user_id,
            record: HomeRecord::new(name, position),
        });
        logging::log_player(
            user_id,
            player,
            &format!("added home \"{}\" at {}", name, position),
        );
        Ok(())
    }

    pub fn remove(&mut self, player: PlayerId, name: &str) -> Result<Home, RemoveError> {
        let Some(Slot::Ready { user_id, homes }) = self.players.get_mut(&player) else {
            return Err(RemoveError::NotLoaded);
        };
        let Some(index) = homes.iter().position(|home| home.name == name) else {
            return Err(RemoveError::NotFound(name.to_string()));
        };
        let removed = homes.remove(index);
        let user_id = *user_id;
        self.storage.submit(StorageJob::Delete {
            user_id,
            name: name.to_string(),
        });
        logging::log_player(user_id, player, &format!("removed home \"{}\"", name));
        Ok(removed)
    }

    /// Insertion-ordered snapshot; empty when the player has none or is not loaded.
    pub fn list(&self, player: PlayerId) -> Vec<Home> {
        match self.players.get(&player) {
            Some(Slot::Ready { homes, .. }) => homes.clone(),
            _ => Vec::new(),
        }
    }

    pub fn get(&self, player: PlayerId, name: &str) -> Option<Home> {
        match self.players.get(&player) {
            Some(Slot::Ready { homes, .. }) => {
                homes.iter().find(|home| home.name == name).cloned()
            }
            _ => None,
        }
    }
}
