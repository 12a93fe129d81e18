//! Team and membership model.
//!
//! A team is created once with a name and grows only through explicit joins.
//! A player appears to the review lifecycle in one of two roles (owner or
//! reviewer); both are read-only projections over the same membership record,
//! never independently mutable copies.

use crate::translate::LanguageId;
use crate::transport::ChatId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Newtype for a chat-platform user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Newtype for a generated team id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamId(pub Uuid);

impl TeamId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A team member.
///
/// `last_reviewer` is the rotation cursor used when this player acts as an
/// owner: the id of the reviewer their previous item was assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub user_id: UserId,
    pub name: String,
    pub login: String,
    pub language: LanguageId,
    pub last_reviewer: Option<UserId>,
}

impl Player {
    pub fn new(user_id: UserId, name: impl Into<String>, login: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            login: login.into(),
            language: LanguageId::default(),
            last_reviewer: None,
        }
    }

    pub fn as_owner(&self) -> Owner<'_> {
        Owner(self)
    }

    pub fn as_reviewer(&self) -> Reviewer<'_> {
        Reviewer(self)
    }
}

/// Read-only owner-role view over a [`Player`].
#[derive(Debug, Clone, Copy)]
pub struct Owner<'a>(&'a Player);

impl Owner<'_> {
    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn language(&self) -> &LanguageId {
        &self.0.language
    }

    pub fn last_reviewer(&self) -> Option<UserId> {
        self.0.last_reviewer
    }
}

/// Read-only reviewer-role view over a [`Player`].
#[derive(Debug, Clone, Copy)]
pub struct Reviewer<'a>(&'a Player);

impl Reviewer<'_> {
    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn language(&self) -> &LanguageId {
        &self.0.language
    }
}

/// A team: ordered roster of players, unique by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    /// Chat the team was created in; review status messages go here.
    pub chat_id: ChatId,
    /// Set once at creation, never renamed.
    pub name: String,
    players: Vec<Player>,
}

impl Team {
    pub fn new(chat_id: ChatId, name: impl Into<String>, creator: Player) -> Self {
        Self {
            id: TeamId::generate(),
            chat_id,
            name: name.into(),
            players: vec![creator],
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn member(&self, user_id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// Add a player to the roster. Joining twice is a no-op; the roster only
    /// grows, never shrinks.
    pub fn join(&mut self, player: Player) {
        if self.member(player.user_id).is_none() {
            self.players.push(player);
        }
    }

    /// Pick the next reviewer for an item owned by `owner_id`, rotating
    /// through the roster in join order and skipping the owner.
    ///
    /// Advances the owner's `last_reviewer` cursor so consecutive items from
    /// the same owner spread across the team. Returns `None` when the owner
    /// is not a member or has no teammate to review for them.
    pub fn next_reviewer(&mut self, owner_id: UserId) -> Option<Player> {
        self.member(owner_id)?;

        let candidates: Vec<usize> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.user_id != owner_id)
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let last = self
            .member(owner_id)
            .and_then(|owner| owner.last_reviewer);

        // Position in the candidate ring just after the previous assignment.
        let next_idx = match last.and_then(|last_id| {
            candidates
                .iter()
                .position(|&i| self.players[i].user_id == last_id)
        }) {
            Some(pos) => candidates[(pos + 1) % candidates.len()],
            None => candidates[0],
        };

        let reviewer = self.players[next_idx].clone();
        if let Some(owner) = self.players.iter_mut().find(|p| p.user_id == owner_id) {
            owner.last_reviewer = Some(reviewer.user_id);
        }
        Some(reviewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: i64) -> Player {
        Player::new(UserId(id), format!("Player {id}"), format!("login{id}"))
    }

    fn three_member_team() -> Team {
        let mut team = Team::new(ChatId(100), "Alpha", player(1));
        team.join(player(2));
        team.join(player(3));
        team
    }

    #[test]
    fn test_join_is_idempotent() {
        let mut team = Team::new(ChatId(100), "Alpha", player(1));
        team.join(player(2));
        team.join(player(2));
        assert_eq!(team.players().len(), 2);
    }

    #[test]
    fn test_name_and_roster_survive_join() {
        let mut team = Team::new(ChatId(100), "Alpha", player(1));
        team.join(player(2));
        assert_eq!(team.name, "Alpha");
        assert_eq!(team.players()[0].user_id, UserId(1));
        assert_eq!(team.players()[1].user_id, UserId(2));
    }

    #[test]
    fn test_next_reviewer_skips_owner() {
        let mut team = three_member_team();
        for _ in 0..6 {
            let reviewer = team.next_reviewer(UserId(1)).unwrap();
            assert_ne!(reviewer.user_id, UserId(1));
        }
    }

    #[test]
    fn test_next_reviewer_rotates() {
        let mut team = three_member_team();
        let first = team.next_reviewer(UserId(1)).unwrap();
        let second = team.next_reviewer(UserId(1)).unwrap();
        let third = team.next_reviewer(UserId(1)).unwrap();
        assert_eq!(first.user_id, UserId(2));
        assert_eq!(second.user_id, UserId(3));
        // Wraps back around the candidate ring.
        assert_eq!(third.user_id, UserId(2));
    }

    #[test]
    fn test_next_reviewer_two_member_team() {
        let mut team = Team::new(ChatId(100), "Alpha", player(1));
        team.join(player(2));
        let reviewer = team.next_reviewer(UserId(1)).unwrap();
        assert_eq!(reviewer.user_id, UserId(2));
        let again = team.next_reviewer(UserId(1)).unwrap();
        assert_eq!(again.user_id, UserId(2));
    }

    #[test]
    fn test_next_reviewer_none_for_lone_owner() {
        let mut team = Team::new(ChatId(100), "Alpha", player(1));
        assert!(team.next_reviewer(UserId(1)).is_none());
    }

    #[test]
    fn test_next_reviewer_none_for_non_member() {
        let mut team = three_member_team();
        assert!(team.next_reviewer(UserId(99)).is_none());
    }

    #[test]
    fn test_owner_view_reads_rotation_cursor() {
        let mut team = three_member_team();
        team.next_reviewer(UserId(1)).unwrap();
        let owner = team.member(UserId(1)).unwrap().as_owner();
        assert_eq!(owner.last_reviewer(), Some(UserId(2)));
    }

    #[test]
    fn test_team_id_parse_round_trip() {
        let id = TeamId::generate();
        assert_eq!(TeamId::parse(&id.to_string()), Some(id));
        assert_eq!(TeamId::parse("not-a-uuid"), None);
    }
}
