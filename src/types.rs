use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::store::TournamentStore;

// ── Constants ──────────────────────────────────────────────────────────

pub const MIN_PARTICIPANTS: usize = 2;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:17880";
pub const DEFAULT_LOG_DIR: &str = "logs";

// ── Ids ────────────────────────────────────────────────────────────────

pub type TournamentId = u64;
pub type ParticipantId = u64;
pub type MatchId = u64;

// ── Shared state type aliases ──────────────────────────────────────────

pub type SharedStore = Arc<Mutex<TournamentStore>>;

// ── Tournament domain types ────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Draft,
    Active,
    Completed,
}

impl TournamentStatus {
    /// Status only ever moves forward one step.
    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        matches!(
            (self, next),
            (TournamentStatus::Draft, TournamentStatus::Active)
                | (TournamentStatus::Active, TournamentStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub game_name: String,
    /// Participant count, locked at activation. Not necessarily a power of two.
    pub bracket_size: u32,
    pub status: TournamentStatus,
    pub created_at: String,
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    pub name: String,
    pub seed: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededParticipant {
    pub id: ParticipantId,
    pub seed: u32,
}

/// A match record as produced by the bracket builder, before storage assigns
/// an id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub round: u32,
    pub position: u32,
    pub player1_id: Option<ParticipantId>,
    pub player2_id: Option<ParticipantId>,
    pub player1_score: Option<u32>,
    pub player2_score: Option<u32>,
    pub winner_id: Option<ParticipantId>,
}

impl NewMatch {
    pub fn placeholder(tournament_id: TournamentId, round: u32, position: u32) -> Self {
        NewMatch {
            tournament_id,
            round,
            position,
            player1_id: None,
            player2_id: None,
            player1_score: None,
            player2_score: None,
            winner_id: None,
        }
    }

    pub fn set_player(&mut self, slot: Slot, id: Option<ParticipantId>) {
        match slot {
            Slot::First => self.player1_id = id,
            Slot::Second => self.player2_id = id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub position: u32,
    pub player1_id: Option<ParticipantId>,
    pub player2_id: Option<ParticipantId>,
    pub player1_score: Option<u32>,
    pub player2_score: Option<u32>,
    pub winner_id: Option<ParticipantId>,
    pub created_at: String,
    pub updated_at_ms: u64,
}

impl Match {
    pub fn from_new(id: MatchId, record: NewMatch, created_at: String, now_ms: u64) -> Self {
        Match {
            id,
            tournament_id: record.tournament_id,
            round: record.round,
            position: record.position,
            player1_id: record.player1_id,
            player2_id: record.player2_id,
            player1_score: record.player1_score,
            player2_score: record.player2_score,
            winner_id: record.winner_id,
            created_at,
            updated_at_ms: now_ms,
        }
    }

    pub fn set_player(&mut self, slot: Slot, id: Option<ParticipantId>) {
        match slot {
            Slot::First => self.player1_id = id,
            Slot::Second => self.player2_id = id,
        }
    }

    /// Both scores and the winner are set to a bye match at build time, so a
    /// resolved match with only one player is a bye.
    pub fn is_bye(&self) -> bool {
        self.winner_id.is_some() && (self.player1_id.is_none() != self.player2_id.is_none())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    First,
    Second,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advancement {
    pub next_round: u32,
    pub next_position: u32,
    pub slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancementTarget {
    pub target_match_id: MatchId,
    pub slot: Slot,
    pub winner_id: ParticipantId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOutcome {
    pub updated_match: Match,
    pub advancement: Option<AdvancementTarget>,
    pub tournament_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundInfo {
    pub round: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSnapshot {
    pub tournament: Tournament,
    pub participants: Vec<Participant>,
    pub matches: Vec<Match>,
    pub total_rounds: u32,
    pub rounds: Vec<RoundInfo>,
    pub champion_id: Option<ParticipantId>,
    pub now_ms: u64,
}
