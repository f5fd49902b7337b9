use std::collections::HashSet;

use crate::error::BracketError;
use crate::types::{Participant, ParticipantId, SeededParticipant, MIN_PARTICIPANTS};

/// Trimmed display name; blank names are rejected.
pub fn normalize_name(raw: &str) -> Result<String, BracketError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(BracketError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Validates a full roster entered at creation. Entry order is seed order.
pub fn validate_roster(raw_names: &[String]) -> Result<Vec<String>, BracketError> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(raw_names.len());
    for raw in raw_names {
        let name = normalize_name(raw)?;
        if !seen.insert(name_key(&name)) {
            return Err(BracketError::DuplicateName(name));
        }
        names.push(name);
    }
    if names.len() < MIN_PARTICIPANTS {
        return Err(BracketError::TooFewParticipants(names.len()));
    }
    Ok(names)
}

/// Validates a name joining an existing roster.
pub fn validate_join(existing: &[Participant], raw_name: &str) -> Result<String, BracketError> {
    let name = normalize_name(raw_name)?;
    let key = name_key(&name);
    if existing.iter().any(|p| name_key(&p.name) == key) {
        return Err(BracketError::DuplicateName(name));
    }
    Ok(name)
}

pub fn next_seed(existing: &[Participant]) -> u32 {
    existing.iter().map(|p| p.seed).max().unwrap_or(0) + 1
}

/// Dense seeds 1..N, keeping the current seed order.
pub fn renumber_seeds(participants: &[Participant]) -> Vec<SeededParticipant> {
    let mut ordered: Vec<&Participant> = participants.iter().collect();
    ordered.sort_by_key(|p| p.seed);
    ordered
        .into_iter()
        .enumerate()
        .map(|(index, p)| SeededParticipant { id: p.id, seed: index as u32 + 1 })
        .collect()
}

/// xorshift64, seedable so a start can be replayed.
#[derive(Clone, Debug)]
pub struct SeedRng {
    state: u64,
}

impl SeedRng {
    pub fn new(seed: u64) -> Self {
        let mut state = seed;
        if state == 0 {
            state = 0x9E37_79B9_7F4A_7C15;
        }
        SeedRng { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish in `0..=max_inclusive`.
    pub fn gen_index(&mut self, max_inclusive: usize) -> usize {
        (self.next_u64() % (max_inclusive as u64 + 1)) as usize
    }
}

/// Fisher-Yates over the roster, then dense seeds 1..N in shuffled order.
pub fn shuffle_seeds(participants: &[Participant], rng: &mut SeedRng) -> Vec<SeededParticipant> {
    let mut ids: Vec<ParticipantId> = participants.iter().map(|p| p.id).collect();
    for i in (1..ids.len()).rev() {
        let j = rng.gen_index(i);
        ids.swap(i, j);
    }
    ids.into_iter()
        .enumerate()
        .map(|(index, id)| SeededParticipant { id, seed: index as u32 + 1 })
        .collect()
}
