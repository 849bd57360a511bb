//! World state tracked for the session currently riding the proxy.

use std::collections::HashMap;

use glam::{IVec2, IVec4};
use gtbridge_proto::packets::OnSpawn;
use gtbridge_web::RedirectTarget;

/// One avatar in the current world.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    /// Net id the server assigned for this world.
    pub net_id: i32,
    /// Account user id.
    pub user_id: i32,
    /// Display name.
    pub name: String,
    /// Two-letter country code.
    pub country_code: String,
    /// Position in world pixels.
    pub position: IVec2,
    /// Collision rectangle.
    pub collision: IVec4,
    /// Invisibility state.
    pub invisible: i32,
    /// Moderator state.
    pub mod_state: i32,
    /// Super moderator state.
    pub supermod_state: i32,
    /// Whether this is the session's own avatar.
    pub is_local: bool,
}

impl Player {
    /// Builds the table entry from a spawn call.
    pub fn from_spawn(spawn: &OnSpawn) -> Self {
        Self {
            net_id: spawn.net_id,
            user_id: spawn.user_id,
            name: spawn.name.clone(),
            country_code: spawn.country_code.clone(),
            position: spawn.position,
            collision: spawn.collision,
            invisible: spawn.invisible,
            mod_state: spawn.mod_state,
            supermod_state: spawn.supermod_state,
            is_local: spawn.is_local(),
        }
    }
}

/// Player table plus the captured server address the next game-client
/// connection should be bridged to.
#[derive(Debug, Default)]
pub struct SessionState {
    players: HashMap<i32, Player>,
    local_net_id: Option<i32>,
    pending_redirect: Option<RedirectTarget>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `player`, replacing any previous entry under the same net id.
    /// A local spawn also records the session's own net id.
    pub fn add_player(&mut self, player: Player) {
        if player.is_local {
            self.local_net_id = Some(player.net_id);
        }
        self.players.insert(player.net_id, player);
    }

    /// Removes the entry for `net_id`. The local avatar is never removed
    /// this way; servers despawn it on world exit and the table is cleared
    /// wholesale on the next join.
    pub fn remove_player(&mut self, net_id: i32) -> Option<Player> {
        if self.local_net_id == Some(net_id) {
            return None;
        }
        self.players.remove(&net_id)
    }

    pub fn player(&self, net_id: i32) -> Option<&Player> {
        self.players.get(&net_id)
    }

    /// The session's own avatar, once it spawned.
    pub fn local_player(&self) -> Option<&Player> {
        self.players.get(&self.local_net_id?)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Drops every avatar and the local marker, ahead of a world join.
    pub fn clear_players(&mut self) {
        self.players.clear();
        self.local_net_id = None;
    }

    /// Records where the next game-client connection should be bridged to.
    pub fn set_redirect(&mut self, target: RedirectTarget) {
        self.pending_redirect = Some(target);
    }

    /// Consumes the captured target. Each capture bridges one connection.
    pub fn take_redirect(&mut self) -> Option<RedirectTarget> {
        self.pending_redirect.take()
    }

    /// Forgets the captured target without using it.
    pub fn clear_redirect(&mut self) {
        self.pending_redirect = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(net_id: i32, is_local: bool) -> Player {
        Player {
            net_id,
            user_id: net_id * 100,
            name: format!("player{net_id}"),
            country_code: "us".to_string(),
            position: IVec2::new(320, 96),
            collision: IVec4::new(0, 0, 20, 30),
            invisible: 0,
            mod_state: 0,
            supermod_state: 0,
            is_local,
        }
    }

    #[test]
    fn test_local_spawn_marks_the_session_avatar() {
        let mut session = SessionState::new();
        session.add_player(player(7, true));
        session.add_player(player(8, false));

        assert_eq!(session.player_count(), 2);
        assert_eq!(session.local_player().map(|p| p.net_id), Some(7));
        assert_eq!(session.player(8).map(|p| p.name.as_str()), Some("player8"));
    }

    #[test]
    fn test_remove_spares_the_local_avatar() {
        let mut session = SessionState::new();
        session.add_player(player(7, true));
        session.add_player(player(8, false));

        assert!(session.remove_player(7).is_none());
        assert!(session.remove_player(8).is_some());
        assert_eq!(session.player_count(), 1);
        assert!(session.local_player().is_some());
    }

    #[test]
    fn test_respawn_replaces_the_entry() {
        let mut session = SessionState::new();
        session.add_player(player(8, false));
        let mut moved = player(8, false);
        moved.position = IVec2::new(640, 192);
        session.add_player(moved);

        assert_eq!(session.player_count(), 1);
        assert_eq!(
            session.player(8).map(|p| p.position),
            Some(IVec2::new(640, 192))
        );
    }

    #[test]
    fn test_clear_resets_the_table() {
        let mut session = SessionState::new();
        session.add_player(player(7, true));
        session.clear_players();

        assert_eq!(session.player_count(), 0);
        assert!(session.local_player().is_none());

        // A fresh world can reuse the old local net id for someone else.
        session.add_player(player(7, false));
        assert!(session.local_player().is_none());
        assert!(session.remove_player(7).is_some());
    }

    #[test]
    fn test_redirect_is_consumed_once() {
        let mut session = SessionState::new();
        assert!(session.take_redirect().is_none());

        session.set_redirect(RedirectTarget {
            address: "213.179.209.168".to_string(),
            port: 17091,
        });
        let target = session.take_redirect().expect("target was captured");
        assert_eq!(target.port, 17091);
        assert!(session.take_redirect().is_none());

        session.set_redirect(RedirectTarget {
            address: "213.179.209.168".to_string(),
            port: 17091,
        });
        session.clear_redirect();
        assert!(session.take_redirect().is_none());
    }
}
