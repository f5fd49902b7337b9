use tracing::debug;

use crate::error::BracketError;
use crate::types::{Advancement, NewMatch, SeededParticipant, Slot, TournamentId, MIN_PARTICIPANTS};

// ── Sizing ──────────────────────────────────────────────────────────────

/// Smallest power of two >= `n`. A bracket always has at least two slots.
pub fn next_power_of_two(n: usize) -> usize {
  if n <= 1 {
    return 2;
  }
  n.next_power_of_two()
}

pub fn bracket_size(participant_count: usize) -> usize {
  next_power_of_two(participant_count)
}

pub fn bye_count(participant_count: usize) -> usize {
  bracket_size(participant_count) - participant_count
}

pub fn total_rounds(participant_count: usize) -> u32 {
  bracket_size(participant_count).trailing_zeros()
}

pub fn is_valid_participant_count(count: usize) -> bool {
  count >= MIN_PARTICIPANTS
}

pub fn matches_in_round(bracket_size: usize, round: u32) -> usize {
  bracket_size >> round
}

// ── Seeding ─────────────────────────────────────────────────────────────

/// 1-based seeds in bracket order. Each doubling replaces seed `s` with
/// `s, 2n + 1 - s`, so consecutive entries are first-round opponents and
/// the best seeds sit as far apart as the tree allows.
fn seed_positions(size: usize) -> Vec<usize> {
  let mut seeds = vec![1usize];
  while seeds.len() < size {
    let n = seeds.len();
    let mut next = Vec::with_capacity(n * 2);
    for seed in seeds.iter().copied() {
      next.push(seed);
      next.push(n * 2 + 1 - seed);
    }
    seeds = next;
  }
  seeds
}

/// First-round pairings as 0-based indices into the seed-sorted roster.
///
/// The first index of a pairing is always the better seed. A `None` second
/// index is a bye: indices `>= participant_count` are empty, and since they
/// are the highest indices they only ever meet one of the top
/// `bye_count` seeds.
pub fn generate_seed_order(bracket_size: usize, participant_count: usize) -> Vec<(usize, Option<usize>)> {
  let size = next_power_of_two(bracket_size);
  seed_positions(size)
    .chunks(2)
    .map(|pair| {
      let top = pair[0] - 1;
      let bottom = pair[1] - 1;
      (top, (bottom < participant_count).then_some(bottom))
    })
    .collect()
}

// ── Advancement ─────────────────────────────────────────────────────────

/// Where the winner of `(round, position)` plays next. Only meaningful when
/// `round` is below the final round.
pub fn resolve_advancement(round: u32, position: u32) -> Advancement {
  Advancement {
    next_round: round + 1,
    next_position: position / 2,
    slot: if position % 2 == 0 { Slot::First } else { Slot::Second },
  }
}

pub fn round_name(round: u32, total_rounds: u32) -> String {
  match total_rounds.saturating_sub(round) {
    0 => "Final".to_string(),
    1 => "Semifinals".to_string(),
    2 => "Quarterfinals".to_string(),
    3 => "Round of 16".to_string(),
    4 => "Round of 32".to_string(),
    _ => format!("Round {round}"),
  }
}

// ── Match graph ─────────────────────────────────────────────────────────

/// Builds every match of the bracket: round 1 seeded (byes resolved 0-0),
/// later rounds as empty placeholders, with bye winners already placed in
/// round 2. Output is ordered by `(round, position)`.
pub fn build_initial_matches(
  tournament_id: TournamentId,
  participants: &[SeededParticipant],
) -> Result<Vec<NewMatch>, BracketError> {
  let participant_count = participants.len();
  if !is_valid_participant_count(participant_count) {
    return Err(BracketError::TooFewParticipants(participant_count));
  }

  let mut sorted = participants.to_vec();
  sorted.sort_by_key(|p| p.seed);

  let size = bracket_size(participant_count);
  let rounds = total_rounds(participant_count);
  let pairings = generate_seed_order(size, participant_count);

  let mut matches = Vec::with_capacity(size - 1);
  let mut bye_winners = Vec::new();

  for (position, (top, bottom)) in pairings.into_iter().enumerate() {
    let position = position as u32;
    let player1 = sorted.get(top).ok_or(BracketError::UnknownSeed(top))?.id;
    let player2 = match bottom {
      Some(index) => Some(sorted.get(index).ok_or(BracketError::UnknownSeed(index))?.id),
      None => None,
    };

    let mut record = NewMatch::placeholder(tournament_id, 1, position);
    record.player1_id = Some(player1);
    record.player2_id = player2;
    if player2.is_none() {
      record.player1_score = Some(0);
      record.player2_score = Some(0);
      record.winner_id = Some(player1);
      bye_winners.push((position, player1));
    }
    matches.push(record);
  }

  for round in 2..=rounds {
    for position in 0..matches_in_round(size, round) {
      matches.push(NewMatch::placeholder(tournament_id, round, position as u32));
    }
  }

  if rounds >= 2 {
    for (position, winner) in bye_winners {
      let advancement = resolve_advancement(1, position);
      place_winner(&mut matches, advancement, winner)?;
      debug!(
        tournament_id,
        winner,
        round = advancement.next_round,
        position = advancement.next_position,
        "bye winner advanced"
      );
    }
  }

  Ok(matches)
}

fn place_winner(matches: &mut [NewMatch], advancement: Advancement, winner: u64) -> Result<(), BracketError> {
  let target = matches
    .iter_mut()
    .find(|m| m.round == advancement.next_round && m.position == advancement.next_position)
    .ok_or(BracketError::MissingMatch {
      round: advancement.next_round,
      position: advancement.next_position,
    })?;
  target.set_player(advancement.slot, Some(winner));
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn roster(n: u64) -> Vec<SeededParticipant> {
    (1..=n).map(|seed| SeededParticipant { id: seed * 100, seed: seed as u32 }).collect()
  }

  #[test]
  fn test_bracket_size_is_smallest_power_of_two() {
    assert_eq!(bracket_size(0), 2);
    assert_eq!(bracket_size(1), 2);
    for n in 2..=200usize {
      let size = bracket_size(n);
      assert!(size.is_power_of_two());
      assert!(size >= n);
      assert!(size / 2 < n, "{size} is not minimal for {n}");
    }
  }

  #[test]
  fn test_bye_count_and_rounds() {
    assert_eq!(bracket_size(5), 8);
    assert_eq!(bye_count(5), 3);
    assert_eq!(bye_count(8), 0);
    assert_eq!(bye_count(3), 1);
    assert_eq!(total_rounds(2), 1);
    assert_eq!(total_rounds(3), 2);
    assert_eq!(total_rounds(8), 3);
    assert_eq!(total_rounds(9), 4);
    for n in 2..=200usize {
      assert!(bye_count(n) < bracket_size(n) / 2);
    }
  }

  #[test]
  fn test_participant_count_validation() {
    assert!(!is_valid_participant_count(0));
    assert!(!is_valid_participant_count(1));
    assert!(is_valid_participant_count(2));
  }

  #[test]
  fn test_seed_order_for_eight() {
    let order = generate_seed_order(8, 8);
    assert_eq!(
      order,
      vec![(0, Some(7)), (3, Some(4)), (1, Some(6)), (2, Some(5))]
    );
  }

  #[test]
  fn test_top_seeds_are_spread() {
    // Seeds 1 and 2 in opposite halves, 1..4 in distinct quarters.
    let order = generate_seed_order(16, 16);
    let position_of = |seed_index: usize| {
      order
        .iter()
        .position(|(a, b)| *a == seed_index || *b == Some(seed_index))
        .unwrap()
    };
    assert_ne!(position_of(0) / 4, position_of(1) / 4);
    let quarters: Vec<usize> = (0..4).map(|s| position_of(s) / 2).collect();
    let mut unique = quarters.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 4);
  }

  #[test]
  fn test_no_double_byes() {
    for n in 2..=130usize {
      let size = bracket_size(n);
      let order = generate_seed_order(size, n);
      assert_eq!(order.len(), size / 2);
      let byes = order.iter().filter(|(_, b)| b.is_none()).count();
      assert_eq!(byes, bye_count(n));
      for (top, _) in &order {
        assert!(*top < n, "pairing with no real player for n={n}");
      }
    }
  }

  #[test]
  fn test_byes_go_to_top_seeds() {
    let order = generate_seed_order(8, 5);
    let mut bye_holders: Vec<usize> = order
      .iter()
      .filter(|(_, b)| b.is_none())
      .map(|(a, _)| *a)
      .collect();
    bye_holders.sort();
    assert_eq!(bye_holders, vec![0, 1, 2]);
  }

  #[test]
  fn test_single_participant_seed_order() {
    assert_eq!(generate_seed_order(2, 1), vec![(0, None)]);
  }

  #[test]
  fn test_advancement() {
    assert_eq!(
      resolve_advancement(1, 0),
      Advancement { next_round: 2, next_position: 0, slot: Slot::First }
    );
    assert_eq!(
      resolve_advancement(1, 1),
      Advancement { next_round: 2, next_position: 0, slot: Slot::Second }
    );
    assert_eq!(
      resolve_advancement(1, 2),
      Advancement { next_round: 2, next_position: 1, slot: Slot::First }
    );
    assert_eq!(
      resolve_advancement(3, 0),
      Advancement { next_round: 4, next_position: 0, slot: Slot::First }
    );
  }

  #[test]
  fn test_round_names() {
    assert_eq!(round_name(3, 3), "Final");
    assert_eq!(round_name(2, 3), "Semifinals");
    assert_eq!(round_name(1, 3), "Quarterfinals");
    assert_eq!(round_name(1, 4), "Round of 16");
    assert_eq!(round_name(1, 5), "Round of 32");
    assert_eq!(round_name(1, 6), "Round 1");
  }

  #[test]
  fn test_four_player_graph() {
    let matches = build_initial_matches(9, &roster(4)).unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!((matches[0].player1_id, matches[0].player2_id), (Some(100), Some(400)));
    assert_eq!((matches[1].player1_id, matches[1].player2_id), (Some(200), Some(300)));
    assert!(matches[..2].iter().all(|m| m.winner_id.is_none() && m.player1_score.is_none()));
    assert_eq!(matches[2], NewMatch::placeholder(9, 2, 0));
  }

  #[test]
  fn test_three_player_graph_advances_bye() {
    let matches = build_initial_matches(1, &roster(3)).unwrap();
    assert_eq!(matches.len(), 3);
    let bye = &matches[0];
    assert_eq!(bye.player1_id, Some(100));
    assert_eq!(bye.player2_id, None);
    assert_eq!(bye.winner_id, Some(100));
    assert_eq!((bye.player1_score, bye.player2_score), (Some(0), Some(0)));
    let live = &matches[1];
    assert_eq!((live.player1_id, live.player2_id), (Some(200), Some(300)));
    assert_eq!(live.winner_id, None);
    let final_match = &matches[2];
    assert_eq!(final_match.round, 2);
    assert_eq!(final_match.player1_id, Some(100));
    assert_eq!(final_match.player2_id, None);
  }

  #[test]
  fn test_five_player_graph_shape() {
    let matches = build_initial_matches(1, &roster(5)).unwrap();
    assert_eq!(matches.len(), 7);
    let round_two: Vec<&NewMatch> = matches.iter().filter(|m| m.round == 2).collect();
    assert_eq!(round_two.len(), 2);
    // Seed 1 bye lands in round 2 position 0 first slot; seed 4 vs 5 feeds the second slot.
    assert_eq!(round_two[0].player1_id, Some(100));
    assert_eq!(round_two[0].player2_id, None);
    assert_eq!(round_two[1].player1_id, Some(200));
    assert_eq!(round_two[1].player2_id, Some(300));
    assert_eq!(matches.iter().filter(|m| m.round == 3).count(), 1);
  }

  #[test]
  fn test_two_players_single_final() {
    let matches = build_initial_matches(1, &roster(2)).unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].round, 1);
    assert_eq!((matches[0].player1_id, matches[0].player2_id), (Some(100), Some(200)));
  }

  #[test]
  fn test_builder_sorts_by_seed() {
    let mut shuffled = roster(4);
    shuffled.reverse();
    assert_eq!(
      build_initial_matches(1, &shuffled).unwrap(),
      build_initial_matches(1, &roster(4)).unwrap()
    );
  }

  #[test]
  fn test_rebuild_is_identical() {
    let participants = roster(11);
    assert_eq!(
      build_initial_matches(3, &participants).unwrap(),
      build_initial_matches(3, &participants).unwrap()
    );
  }

  #[test]
  fn test_too_few_participants() {
    assert_eq!(
      build_initial_matches(1, &roster(1)),
      Err(BracketError::TooFewParticipants(1))
    );
    assert_eq!(build_initial_matches(1, &[]), Err(BracketError::TooFewParticipants(0)));
  }
}
