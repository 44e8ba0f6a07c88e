use crate::entities::player::{ActorState, PlayerId, Profile};
use crate::homes::presenter::HomePage;
use crate::world::position::Position;

/// Rank/profile service. May have no record yet right after a player joins.
pub trait ProfileSource {
    fn profile(&self, player: PlayerId) -> Option<Profile>;
}

/// Timed on-screen notifications.
pub trait Notifier {
    fn add_timed_notification(
        &mut self,
        player: PlayerId,
        key: &str,
        label: &str,
        duration_seconds: u64,
        color: &str,
    );
    fn remove_timed_notification(&mut self, player: PlayerId, key: &str);
}

/// The game server hosting the homes feature.
pub trait Host: ProfileSource + Notifier {
    /// `None` once the player has disconnected.
    fn actor(&self, player: PlayerId) -> Option<ActorState>;
    fn apply_position(&mut self, player: PlayerId, position: Position);
    fn send_message(&mut self, player: PlayerId, text: &str);
    fn show_home_page(&mut self, player: PlayerId, page: &HomePage);
    fn close_home_page(&mut self, player: PlayerId);
}
