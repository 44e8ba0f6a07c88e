use crate::entities::rank::RankLevel;
use crate::world::position::Position;

/// Session identity assigned by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(pub u64);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of the movement-relevant state of a connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorState {
    pub id: PlayerId,
    pub position: Position,
    pub alive: bool,
    pub wounded: bool,
    pub can_build: bool,
    pub swimming: bool,
    pub crafting_queue: usize,
}

impl ActorState {
    pub fn new(id: PlayerId, position: Position) -> Self {
        Self {
            id,
            position,
            alive: true,
            wounded: false,
            can_build: true,
            swimming: false,
            crafting_queue: 0,
        }
    }

    pub fn is_crafting(&self) -> bool {
        self.crafting_queue > 0
    }
}

/// Profile record owned by the rank service. `id` keys durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: u32,
    pub rank: RankLevel,
}

impl Profile {
    pub fn new(id: u32, rank: RankLevel) -> Self {
        Self { id, rank }
    }

    pub fn has_minimum_rank(&self, tier: RankLevel) -> bool {
        self.rank >= tier
    }
}
