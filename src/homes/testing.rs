use crate::entities::player::{ActorState, PlayerId, Profile};
use crate::entities::rank::RankLevel;
use crate::homes::host::{Host, Notifier, ProfileSource};
use crate::homes::presenter::HomePage;
use crate::world::position::Position;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    AddNotification {
        player: PlayerId,
        key: String,
        label: String,
        seconds: u64,
        color: String,
    },
    RemoveNotification {
        player: PlayerId,
        key: String,
    },
    Apply {
        player: PlayerId,
        position: Position,
    },
    Message {
        player: PlayerId,
        text: String,
    },
    ShowPage {
        player: PlayerId,
        page: HomePage,
    },
    ClosePage {
        player: PlayerId,
    },
}

/// Recording host for unit tests.
#[derive(Debug, Default)]
pub struct FakeHost {
    pub actors: HashMap<PlayerId, ActorState>,
    pub profiles: HashMap<PlayerId, Profile>,
    pub calls: Vec<HostCall>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, player: PlayerId, user_id: u32, rank: RankLevel, position: Position) {
        self.actors.insert(player, ActorState::new(player, position));
        self.profiles.insert(player, Profile::new(user_id, rank));
    }

    pub fn leave(&mut self, player: PlayerId) {
        self.actors.remove(&player);
        self.profiles.remove(&player);
    }

    pub fn actor_mut(&mut self, player: PlayerId) -> &mut ActorState {
        self.actors.get_mut(&player).expect("actor joined")
    }

    pub fn applied(&self, player: PlayerId) -> Vec<Position> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Apply {
                    player: target,
                    position,
                } if *target == player => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self, player: PlayerId) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                HostCall::Message {
                    player: target,
                    text,
                } if *target == player => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_message(&self, player: PlayerId) -> Option<String> {
        self.messages(player).pop()
    }

    pub fn last_page(&self, player: PlayerId) -> Option<HomePage> {
        self.calls.iter().rev().find_map(|call| match call {
            HostCall::ShowPage {
                player: target,
                page,
            } if *target == player => Some(page.clone()),
            _ => None,
        })
    }
}

impl ProfileSource for FakeHost {
    fn profile(&self, player: PlayerId) -> Option<Profile> {
        self.profiles.get(&player).cloned()
    }
}

impl Notifier for FakeHost {
    fn add_timed_notification(
        &mut self,
        player: PlayerId,
        key: &str,
        label: &str,
        duration_seconds: u64,
        color: &str,
    ) {
        self.calls.push(HostCall::AddNotification {
            player,
            key: key.to_string(),
            label: label.to_string(),
            seconds: duration_seconds,
            color: color.to_string(),
        });
    }

    fn remove_timed_notification(&mut self, player: PlayerId, key: &str) {
        self.calls.push(HostCall::RemoveNotification {
            player,
            key: key.to_string(),
        });
    }
}

impl Host for FakeHost {
    fn actor(&self, player: PlayerId) -> Option<ActorState> {
        self.actors.get(&player).cloned()
    }

    fn apply_position(&mut self, player: PlayerId, position: Position) {
        if let Some(actor) = self.actors.get_mut(&player) {
            actor.position = position;
        }
        self.calls.push(HostCall::Apply { player, position });
    }

    fn send_message(&mut self, player: PlayerId, text: &str) {
        self.calls.push(HostCall::Message {
            player,
            text: text.to_string(),
        });
    }

    fn show_home_page(&mut self, player: PlayerId, page: &HomePage) {
        self.calls.push(HostCall::ShowPage {
            player,
            page: page.clone(),
        });
    }

    fn close_home_page(&mut self, player: PlayerId) {
        self.calls.push(HostCall::ClosePage { player });
    }
}
