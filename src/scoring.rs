use tracing::{debug, info};

use crate::bracket::resolve_advancement;
use crate::error::BracketError;
use crate::types::{AdvancementTarget, Match, MatchId, ParticipantId, ScoreOutcome, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchState {
  /// No players yet.
  Empty,
  /// One side filled, waiting on the other feeder match.
  Waiting,
  /// Both players present, no winner.
  Ready,
  Resolved,
}

pub fn match_state(m: &Match) -> MatchState {
  if m.winner_id.is_some() {
    return MatchState::Resolved;
  }
  match (m.player1_id, m.player2_id) {
    (Some(_), Some(_)) => MatchState::Ready,
    (None, None) => MatchState::Empty,
    _ => MatchState::Waiting,
  }
}

/// Parses one entered score. Surrounding whitespace is ignored.
pub fn parse_score(raw: &str) -> Result<u32, BracketError> {
  let trimmed = raw.trim();
  if let Some(rest) = trimmed.strip_prefix('-') {
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
      return Err(BracketError::NegativeScore(trimmed.to_string()));
    }
  }
  // Digits only: `u32::from_str` would also take a leading '+'.
  if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
    return Err(BracketError::NonNumericScore(trimmed.to_string()));
  }
  trimmed
    .parse::<u32>()
    .map_err(|_| BracketError::ScoreTooLarge(trimmed.to_string()))
}

/// Higher score wins; ties have no winner.
pub fn winning_slot(score1: u32, score2: u32) -> Result<Slot, BracketError> {
  if score1 == score2 {
    return Err(BracketError::TiedScore(score1));
  }
  Ok(if score1 > score2 { Slot::First } else { Slot::Second })
}

/// Computes the effect of submitting `score1`-`score2` for `match_id`
/// without touching `matches`. The caller persists it with [`apply_outcome`].
pub fn submit_score(
  matches: &[Match],
  match_id: MatchId,
  score1: u32,
  score2: u32,
  total_rounds: u32,
) -> Result<ScoreOutcome, BracketError> {
  let current = matches
    .iter()
    .find(|m| m.id == match_id)
    .ok_or(BracketError::MatchNotFound(match_id))?;

  match match_state(current) {
    MatchState::Resolved => return Err(BracketError::MatchAlreadyResolved(match_id)),
    MatchState::Empty | MatchState::Waiting => return Err(BracketError::MatchNotReady(match_id)),
    MatchState::Ready => {}
  }

  let winner_id = match winning_slot(score1, score2)? {
    Slot::First => current.player1_id,
    Slot::Second => current.player2_id,
  }
  .ok_or(BracketError::MatchNotReady(match_id))?;

  let mut updated_match = current.clone();
  updated_match.player1_score = Some(score1);
  updated_match.player2_score = Some(score2);
  updated_match.winner_id = Some(winner_id);

  if current.round >= total_rounds {
    return Ok(ScoreOutcome {
      updated_match,
      advancement: None,
      tournament_completed: true,
    });
  }

  let next = resolve_advancement(current.round, current.position);
  let target = matches
    .iter()
    .find(|m| {
      m.tournament_id == current.tournament_id
        && m.round == next.next_round
        && m.position == next.next_position
    })
    .ok_or(BracketError::MissingMatch {
      round: next.next_round,
      position: next.next_position,
    })?;

  Ok(ScoreOutcome {
    updated_match,
    advancement: Some(AdvancementTarget {
      target_match_id: target.id,
      slot: next.slot,
      winner_id,
    }),
    tournament_completed: false,
  })
}

/// Writes a computed outcome into `matches` as one update. Fails with
/// `Conflict` if the match was resolved after the outcome was computed.
pub fn apply_outcome(matches: &mut [Match], outcome: &ScoreOutcome, now_ms: u64) -> Result<(), BracketError> {
  let match_id = outcome.updated_match.id;
  let source_index = matches
    .iter()
    .position(|m| m.id == match_id)
    .ok_or(BracketError::MatchNotFound(match_id))?;
  if matches[source_index].winner_id.is_some() {
    return Err(BracketError::Conflict(match_id));
  }

  let target_index = match outcome.advancement {
    Some(target) => Some(
      matches
        .iter()
        .position(|m| m.id == target.target_match_id)
        .ok_or(BracketError::MatchNotFound(target.target_match_id))?,
    ),
    None => None,
  };

  let source = &mut matches[source_index];
  source.player1_score = outcome.updated_match.player1_score;
  source.player2_score = outcome.updated_match.player2_score;
  source.winner_id = outcome.updated_match.winner_id;
  source.updated_at_ms = now_ms;
  debug!(match_id, winner = ?source.winner_id, "match resolved");

  if let (Some(index), Some(target)) = (target_index, outcome.advancement) {
    let next = &mut matches[index];
    next.set_player(target.slot, Some(target.winner_id));
    next.updated_at_ms = now_ms;
    debug!(
      target_match_id = target.target_match_id,
      slot = ?target.slot,
      winner = target.winner_id,
      "winner advanced"
    );
  }

  if outcome.tournament_completed {
    info!(match_id, champion = ?outcome.updated_match.winner_id, "final resolved");
  }
  Ok(())
}

/// Winner of the final, once it has been played.
pub fn champion(matches: &[Match], total_rounds: u32) -> Option<ParticipantId> {
  matches
    .iter()
    .find(|m| m.round == total_rounds)
    .and_then(|m| m.winner_id)
}
