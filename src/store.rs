use chrono::Utc;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::bracket::{build_initial_matches, round_name, total_rounds};
use crate::error::BracketError;
use crate::participants::{next_seed, renumber_seeds, shuffle_seeds, validate_join, validate_roster, SeedRng};
use crate::scoring::{apply_outcome, champion, submit_score};
use crate::types::{
  Match, MatchId, NewMatch, Participant, ParticipantId, RoundInfo, ScoreOutcome, SeededParticipant, Tournament,
  TournamentId, TournamentSnapshot, TournamentStatus, MIN_PARTICIPANTS,
};

#[derive(Clone, Debug)]
struct TournamentRecord {
  tournament: Tournament,
  participants: Vec<Participant>,
  matches: Vec<Match>,
}

impl TournamentRecord {
  fn total_rounds(&self) -> u32 {
    if self.matches.is_empty() {
      return 0;
    }
    total_rounds(self.tournament.bracket_size as usize)
  }
}

/// In-memory tournament storage. Every mutation runs to completion on
/// `&mut self`, so a shared store behind one lock applies each score
/// submission as a single update.
pub struct TournamentStore {
  records: HashMap<TournamentId, TournamentRecord>,
  match_index: HashMap<MatchId, TournamentId>,
  next_tournament_id: TournamentId,
  next_participant_id: ParticipantId,
  next_match_id: MatchId,
  rng: SeedRng,
}

fn timestamp() -> String {
  Utc::now().to_rfc3339()
}

fn required(raw: &str, field: &'static str) -> Result<String, BracketError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(BracketError::MissingField(field));
  }
  Ok(trimmed.to_string())
}

fn transition(tournament: &mut Tournament, to: TournamentStatus, now_ms: u64) -> Result<(), BracketError> {
  if !tournament.status.can_transition_to(to) {
    return Err(BracketError::IllegalTransition {
      from: tournament.status,
      to,
    });
  }
  tournament.status = to;
  tournament.updated_at_ms = now_ms;
  Ok(())
}

fn expect_status(tournament: &Tournament, expected: TournamentStatus) -> Result<(), BracketError> {
  if tournament.status != expected {
    return Err(BracketError::WrongStatus {
      id: tournament.id,
      actual: tournament.status,
      expected,
    });
  }
  Ok(())
}

impl TournamentStore {
  pub fn new(shuffle_seed: u64) -> Self {
    TournamentStore {
      records: HashMap::new(),
      match_index: HashMap::new(),
      next_tournament_id: 1,
      next_participant_id: 1,
      next_match_id: 1,
      rng: SeedRng::new(shuffle_seed),
    }
  }

  pub fn list(&self) -> Vec<Tournament> {
    let mut out: Vec<Tournament> = self.records.values().map(|r| r.tournament.clone()).collect();
    out.sort_by_key(|t| t.id);
    out
  }

  /// Creates an active tournament from a full roster given in seed order.
  pub fn create_tournament(
    &mut self,
    name: &str,
    game_name: &str,
    participant_names: &[String],
    now_ms: u64,
  ) -> Result<TournamentSnapshot, BracketError> {
    let name = required(name, "tournament name")?;
    let game_name = required(game_name, "game name")?;
    let names = validate_roster(participant_names)?;

    let id = self.alloc_tournament_id();
    let created_at = timestamp();
    let participants: Vec<Participant> = names
      .into_iter()
      .enumerate()
      .map(|(index, name)| Participant {
        id: self.alloc_participant_id(),
        tournament_id: id,
        name,
        seed: index as u32 + 1,
        created_at: created_at.clone(),
      })
      .collect();
    let seeded: Vec<SeededParticipant> = participants
      .iter()
      .map(|p| SeededParticipant { id: p.id, seed: p.seed })
      .collect();
    let built = build_initial_matches(id, &seeded)?;

    let tournament = Tournament {
      id,
      name,
      game_name,
      bracket_size: participants.len() as u32,
      status: TournamentStatus::Active,
      created_at,
      updated_at_ms: now_ms,
    };
    let mut record = TournamentRecord {
      tournament,
      participants,
      matches: Vec::new(),
    };
    self.insert_matches(&mut record, built, now_ms);
    info!(
      tournament_id = id,
      participants = record.participants.len(),
      rounds = record.total_rounds(),
      "tournament created"
    );
    self.records.insert(id, record);
    self.snapshot(id, None, now_ms)
  }

  pub fn create_draft(&mut self, name: &str, game_name: &str, now_ms: u64) -> Result<Tournament, BracketError> {
    let name = required(name, "tournament name")?;
    let game_name = required(game_name, "game name")?;
    let id = self.alloc_tournament_id();
    let tournament = Tournament {
      id,
      name,
      game_name,
      bracket_size: 0,
      status: TournamentStatus::Draft,
      created_at: timestamp(),
      updated_at_ms: now_ms,
    };
    self.records.insert(
      id,
      TournamentRecord {
        tournament: tournament.clone(),
        participants: Vec::new(),
        matches: Vec::new(),
      },
    );
    info!(tournament_id = id, "draft tournament created");
    Ok(tournament)
  }

  pub fn join(&mut self, tournament_id: TournamentId, raw_name: &str, now_ms: u64) -> Result<Participant, BracketError> {
    let participant_id = self.next_participant_id;
    let record = self.record_mut(tournament_id)?;
    expect_status(&record.tournament, TournamentStatus::Draft)?;
    let name = validate_join(&record.participants, raw_name)?;
    let participant = Participant {
      id: participant_id,
      tournament_id,
      name,
      seed: next_seed(&record.participants),
      created_at: timestamp(),
    };
    record.participants.push(participant.clone());
    record.tournament.updated_at_ms = now_ms;
    self.next_participant_id += 1;
    Ok(participant)
  }

  /// Removes a participant from a draft; the remaining seeds are renumbered.
  pub fn leave(
    &mut self,
    tournament_id: TournamentId,
    participant_id: ParticipantId,
    now_ms: u64,
  ) -> Result<(), BracketError> {
    let record = self.record_mut(tournament_id)?;
    expect_status(&record.tournament, TournamentStatus::Draft)?;
    let before = record.participants.len();
    record.participants.retain(|p| p.id != participant_id);
    if record.participants.len() == before {
      return Err(BracketError::ParticipantNotFound(participant_id));
    }
    let renumbered = renumber_seeds(&record.participants);
    apply_seeds(&mut record.participants, &renumbered);
    record.tournament.updated_at_ms = now_ms;
    Ok(())
  }

  /// Locks a draft roster: shuffles seeds, fixes the bracket size and builds
  /// every match.
  pub fn start(&mut self, tournament_id: TournamentId, now_ms: u64) -> Result<TournamentSnapshot, BracketError> {
    let mut record = self.record(tournament_id)?.clone();
    expect_status(&record.tournament, TournamentStatus::Draft)?;
    if record.participants.len() < MIN_PARTICIPANTS {
      return Err(BracketError::TooFewParticipants(record.participants.len()));
    }

    let seeded = shuffle_seeds(&record.participants, &mut self.rng);
    let built = build_initial_matches(tournament_id, &seeded)?;
    apply_seeds(&mut record.participants, &seeded);
    record.tournament.bracket_size = record.participants.len() as u32;
    transition(&mut record.tournament, TournamentStatus::Active, now_ms)?;
    self.insert_matches(&mut record, built, now_ms);
    info!(
      tournament_id,
      participants = record.participants.len(),
      rounds = record.total_rounds(),
      "tournament started"
    );
    self.records.insert(tournament_id, record);
    self.snapshot(tournament_id, None, now_ms)
  }

  pub fn submit_score(
    &mut self,
    match_id: MatchId,
    score1: u32,
    score2: u32,
    now_ms: u64,
  ) -> Result<ScoreOutcome, BracketError> {
    let tournament_id = *self
      .match_index
      .get(&match_id)
      .ok_or(BracketError::MatchNotFound(match_id))?;
    let record = self.record_mut(tournament_id)?;
    expect_status(&record.tournament, TournamentStatus::Active)?;

    let rounds = record.total_rounds();
    let outcome = submit_score(&record.matches, match_id, score1, score2, rounds)?;
    apply_outcome(&mut record.matches, &outcome, now_ms)?;
    record.tournament.updated_at_ms = now_ms;

    let mut outcome = outcome;
    if let Some(stored) = record.matches.iter().find(|m| m.id == match_id) {
      outcome.updated_match = stored.clone();
    }
    if outcome.tournament_completed {
      transition(&mut record.tournament, TournamentStatus::Completed, now_ms)?;
      info!(tournament_id, champion = ?outcome.updated_match.winner_id, "tournament completed");
    }
    Ok(outcome)
  }

  /// Current view of one tournament. With `since_ms`, only matches updated
  /// after that instant are returned, and the roster only while it can still
  /// change (a draft) or when the tournament itself changed since then.
  pub fn snapshot(
    &self,
    tournament_id: TournamentId,
    since_ms: Option<u64>,
    now_ms: u64,
  ) -> Result<TournamentSnapshot, BracketError> {
    let record = self.record(tournament_id)?;
    let rounds = record.total_rounds();

    let mut participants = record.participants.clone();
    participants.sort_by_key(|p| p.seed);
    let mut matches = record.matches.clone();
    matches.sort_by_key(|m| (m.round, m.position));

    let champion_id = champion(&matches, rounds);
    if let Some(since) = since_ms {
      if since > 0 {
        matches.retain(|m| m.updated_at_ms > since);
        let roster_open = record.tournament.status == TournamentStatus::Draft;
        if !roster_open && record.tournament.updated_at_ms <= since {
          participants = Vec::new();
        }
      }
    }

    Ok(TournamentSnapshot {
      tournament: record.tournament.clone(),
      participants,
      matches,
      total_rounds: rounds,
      rounds: (1..=rounds)
        .map(|round| RoundInfo {
          round,
          name: round_name(round, rounds),
        })
        .collect(),
      champion_id,
      now_ms,
    })
  }

  fn record(&self, tournament_id: TournamentId) -> Result<&TournamentRecord, BracketError> {
    self
      .records
      .get(&tournament_id)
      .ok_or(BracketError::TournamentNotFound(tournament_id))
  }

  fn record_mut(&mut self, tournament_id: TournamentId) -> Result<&mut TournamentRecord, BracketError> {
    self
      .records
      .get_mut(&tournament_id)
      .ok_or(BracketError::TournamentNotFound(tournament_id))
  }

  fn insert_matches(&mut self, record: &mut TournamentRecord, built: Vec<NewMatch>, now_ms: u64) {
    let created_at = timestamp();
    for new_match in built {
      let id = self.next_match_id;
      self.next_match_id += 1;
      if self.match_index.insert(id, record.tournament.id).is_some() {
        warn!(match_id = id, "match id reused");
      }
      record
        .matches
        .push(Match::from_new(id, new_match, created_at.clone(), now_ms));
    }
  }

  fn alloc_tournament_id(&mut self) -> TournamentId {
    let id = self.next_tournament_id;
    self.next_tournament_id += 1;
    id
  }

  fn alloc_participant_id(&mut self) -> ParticipantId {
    let id = self.next_participant_id;
    self.next_participant_id += 1;
    id
  }
}

fn apply_seeds(participants: &mut [Participant], seeded: &[SeededParticipant]) {
  let seeds: HashMap<ParticipantId, u32> = seeded.iter().map(|p| (p.id, p.seed)).collect();
  for participant in participants.iter_mut() {
    if let Some(seed) = seeds.get(&participant.id) {
      participant.seed = *seed;
    }
  }
}
