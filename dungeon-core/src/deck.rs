//! Dungeon deck construction.
//!
//! The deck is the ordered list of room cards that the entrance door
//! carries when a quest begins. Cards are drawn from the front.

use crate::catalog::{HIDDEN_TREASURE_ROOM, ROOM_CATALOG};
use crate::room::{RoomCategory, RoomDescriptor};
use crate::state::SideQuest;
use rand::seq::SliceRandom;
use rand::Rng;

/// What a quest asks the deck builder for.
#[derive(Debug, Clone, Copy)]
pub struct DeckRequest<'a> {
    pub room_count: usize,
    pub corridor_count: usize,
    /// Card names that must not be dealt.
    pub excluded: &'a [String],
    pub side_quests: &'a [SideQuest],
    pub objective: Option<&'a RoomDescriptor>,
}

/// Build a deck from the built-in catalog.
pub fn build_deck<R: Rng + ?Sized>(rng: &mut R, request: &DeckRequest<'_>) -> Vec<RoomDescriptor> {
    build_deck_from(rng, &ROOM_CATALOG, request)
}

/// Build a deck from an arbitrary catalog.
///
/// Counts larger than what the catalog offers are capped silently. The
/// objective card, when present, always lands in the second half of the
/// deck so the party has to dig before finding it.
pub fn build_deck_from<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &[RoomDescriptor],
    request: &DeckRequest<'_>,
) -> Vec<RoomDescriptor> {
    let mut cards = sample(rng, catalog, RoomCategory::Room, request.room_count, request.excluded);
    cards.extend(sample(
        rng,
        catalog,
        RoomCategory::Corridor,
        request.corridor_count,
        request.excluded,
    ));
    cards.shuffle(rng);

    // The top half takes the odd card so the objective half never
    // reaches above the middle of the deck.
    let mut bottom = cards.split_off(cards.len().div_ceil(2));
    let mut top = cards;

    if request.side_quests.contains(&SideQuest::HiddenTreasure) {
        let at = rng.gen_range(0..=top.len());
        top.insert(at, HIDDEN_TREASURE_ROOM.clone());
    }

    if let Some(objective) = request.objective {
        bottom.push(objective.clone());
        bottom.shuffle(rng);
    }

    tracing::debug!(
        top = top.len(),
        bottom = bottom.len(),
        objective = request.objective.is_some(),
        "dungeon deck built"
    );

    top.extend(bottom);
    top
}

fn sample<R: Rng + ?Sized>(
    rng: &mut R,
    catalog: &[RoomDescriptor],
    category: RoomCategory,
    count: usize,
    excluded: &[String],
) -> Vec<RoomDescriptor> {
    let mut pool: Vec<&RoomDescriptor> = catalog
        .iter()
        .filter(|d| d.category == category && !excluded.contains(&d.name))
        .collect();
    pool.shuffle(rng);
    pool.into_iter().take(count).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::HIDDEN_TREASURE;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn request<'a>(rooms: usize, corridors: usize) -> DeckRequest<'a> {
        DeckRequest {
            room_count: rooms,
            corridor_count: corridors,
            excluded: &[],
            side_quests: &[],
            objective: None,
        }
    }

    #[test]
    fn test_counts_and_distinct_cards() {
        let mut rng = StdRng::seed_from_u64(1);
        let deck = build_deck(&mut rng, &request(6, 4));
        assert_eq!(deck.len(), 10);
        let names: HashSet<_> = deck.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.len(), 10);
        let rooms = deck
            .iter()
            .filter(|d| d.category == RoomCategory::Room)
            .count();
        assert_eq!(rooms, 6);
    }

    #[test]
    fn test_counts_are_capped() {
        let mut rng = StdRng::seed_from_u64(2);
        let deck = build_deck(&mut rng, &request(100, 100));
        assert_eq!(deck.len(), ROOM_CATALOG.len());
    }

    #[test]
    fn test_excluded_rooms_never_dealt() {
        let excluded = vec!["Crypt".to_string(), "Bend".to_string()];
        let mut rng = StdRng::seed_from_u64(3);
        let deck = build_deck(
            &mut rng,
            &DeckRequest {
                excluded: &excluded,
                ..request(100, 100)
            },
        );
        assert_eq!(deck.len(), ROOM_CATALOG.len() - 2);
        assert!(deck.iter().all(|d| !excluded.contains(&d.name)));
    }

    #[test]
    fn test_objective_always_in_second_half() {
        let objective = RoomDescriptor::room("Lich's Sanctum", 6, 6, 0);
        for seed in 0..200 {
            for (rooms, corridors) in [(5, 0), (4, 3), (1, 0), (0, 0), (8, 6)] {
                let mut rng = StdRng::seed_from_u64(seed);
                let deck = build_deck(
                    &mut rng,
                    &DeckRequest {
                        objective: Some(&objective),
                        ..request(rooms, corridors)
                    },
                );
                assert_eq!(deck.len(), rooms + corridors + 1);
                let at = deck.iter().position(|d| d.name == objective.name).unwrap();
                assert!(at >= deck.len() / 2, "seed {seed}: objective at {at} of {}", deck.len());
            }
        }
    }

    #[test]
    fn test_hidden_treasure_in_first_half() {
        let side_quests = vec![SideQuest::HiddenTreasure];
        let objective = RoomDescriptor::room("Vault of Ages", 5, 5, 0);
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let deck = build_deck(
                &mut rng,
                &DeckRequest {
                    side_quests: &side_quests,
                    objective: Some(&objective),
                    ..request(5, 4)
                },
            );
            assert_eq!(deck.len(), 11);
            let treasure = deck.iter().position(|d| d.name == HIDDEN_TREASURE).unwrap();
            let goal = deck.iter().position(|d| d.name == objective.name).unwrap();
            assert!(treasure <= 5);
            assert!(goal >= 6);
        }
    }

    #[test]
    fn test_same_seed_same_deck() {
        let a = build_deck(&mut StdRng::seed_from_u64(9), &request(5, 5));
        let b = build_deck(&mut StdRng::seed_from_u64(9), &request(5, 5));
        assert_eq!(a, b);
    }
}
