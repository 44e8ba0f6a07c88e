use crate::entities::player::ActorState;
use crate::world::position::Position;

/// Why an actor cannot be moved right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    Dead,
    Wounded,
    BuildingBlocked,
    Swimming,
    Crafting,
    Disconnected,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Reason::Dead => "dead",
            Reason::Wounded => "wounded",
            Reason::BuildingBlocked => "building blocked",
            Reason::Swimming => "swimming",
            Reason::Crafting => "crafting",
            Reason::Disconnected => "disconnected",
        };
        f.write_str(text)
    }
}

/// First blocking condition at the actor's current location, in fixed precedence.
pub fn can_teleport_from(actor: &ActorState) -> Option<Reason> {
    if !actor.alive {
        return Some(Reason::Dead);
    }
    if actor.wounded {
        return Some(Reason::Wounded);
    }
    if !actor.can_build {
        return Some(Reason::BuildingBlocked);
    }
    if actor.swimming {
        return Some(Reason::Swimming);
    }
    if actor.is_crafting() {
        return Some(Reason::Crafting);
    }
    None
}

/// Destination policy; every position is currently allowed.
pub fn can_teleport_to_position(_actor: &ActorState, _position: Position) -> Option<Reason> {
    None
}

/// Player-to-player policy; every target is currently allowed.
pub fn can_teleport_to_actor(_actor: &ActorState, _target: &ActorState) -> Option<Reason> {
    None
}
