use std::collections::HashMap;

use crate::dto::draft_dto::{
    CompletedPick, CurrentPick, DraftConfiguration, PickOwnershipTrade, PickResolution,
    ResolvedPick, RosterId,
};
use crate::error::ConfigurationError;

/// Number of upcoming picks reported for the requesting roster.
pub const MAX_UPCOMING_PICKS: usize = 5;

pub fn absolute_pick_number(round: u32, pick_in_round: u32, total_teams: u32) -> u32 {
    (round - 1) * total_teams + pick_in_round
}

/// Original slot holding `pick_in_round` under snake ordering. Even rounds run in reverse.
pub fn snake_slot(round: u32, pick_in_round: u32, total_teams: u32) -> u32 {
    if round % 2 == 1 {
        pick_in_round
    } else {
        total_teams - pick_in_round + 1
    }
}

/// Resolves the draft pointer and the requesting roster's next picks.
///
/// Trades are applied against the original slot owner only; a pick that was
/// traded twice resolves to the first hop's new owner.
pub fn resolve_picks(
    config: &DraftConfiguration,
    completed: &[CompletedPick],
    trades: &[PickOwnershipTrade],
    requesting: Option<&RosterId>,
) -> Result<PickResolution, ConfigurationError> {
    config.validate()?;
    validate_trades(config, trades)?;

    let teams = config.total_teams;
    let total_picks = config.total_picks();

    let completed_count = completed.iter().filter(|p| p.player_id.is_some()).count() as u32;
    let current_pick_number = completed_count + 1;
    let current_round = current_pick_number.div_ceil(teams);
    let pick_in_round = ((current_pick_number - 1) % teams) + 1;

    let current_pick = CurrentPick {
        round: current_round,
        pick_in_round,
        absolute_pick_number: current_pick_number,
        total_picks,
    };

    let owned_picks = match requesting {
        Some(roster) if config.slot_assignment.contains_key(roster) => {
            upcoming_picks(config, trades, roster, current_round, current_pick_number)
        }
        _ => Vec::new(),
    };

    Ok(PickResolution {
        current_pick,
        owned_picks,
        traded_picks_count: trades.len(),
    })
}

fn upcoming_picks(
    config: &DraftConfiguration,
    trades: &[PickOwnershipTrade],
    roster: &RosterId,
    current_round: u32,
    current_pick_number: u32,
) -> Vec<ResolvedPick> {
    let teams = config.total_teams;
    let owner_of_slot: HashMap<u32, &RosterId> = config
        .slot_assignment
        .iter()
        .map(|(roster, &slot)| (slot, roster))
        .collect();

    let mut picks = Vec::new();
    for round in current_round..=config.total_rounds {
        for pick in 1..=teams {
            let absolute = absolute_pick_number(round, pick, teams);
            if absolute < current_pick_number {
                continue;
            }

            let Some(&original_owner) = owner_of_slot.get(&snake_slot(round, pick, teams)) else {
                continue;
            };

            let trade = trades.iter().find(|t| {
                t.season == config.season && t.round == round && &t.previous_owner == original_owner
            });
            let current_owner = trade.map_or(original_owner, |t| &t.new_owner);

            if current_owner == roster {
                picks.push(ResolvedPick {
                    round,
                    pick_in_round: pick,
                    absolute_pick_number: absolute,
                    is_next: absolute == current_pick_number,
                    picks_away: absolute - current_pick_number,
                    is_traded: current_owner != original_owner,
                });
            }
        }
    }

    picks.sort_by_key(|p| p.absolute_pick_number);
    picks.truncate(MAX_UPCOMING_PICKS);
    picks
}

/// Only trades for this draft's season can affect ownership, so only those are checked.
fn validate_trades(
    config: &DraftConfiguration,
    trades: &[PickOwnershipTrade],
) -> Result<(), ConfigurationError> {
    if config.slot_assignment.is_empty() {
        return Ok(());
    }

    for trade in trades.iter().filter(|t| t.season == config.season) {
        if trade.round == 0 || trade.round > config.total_rounds {
            return Err(ConfigurationError::TradeRoundOutOfRange {
                round: trade.round,
                rounds: config.total_rounds,
            });
        }
        for roster in [&trade.previous_owner, &trade.new_owner] {
            if !config.slot_assignment.contains_key(roster) {
                return Err(ConfigurationError::UnknownTradeRoster {
                    round: trade.round,
                    roster: roster.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// Roster `team{n}` owns slot `n`.
    fn league(teams: u32, rounds: u32) -> DraftConfiguration {
        let slot_assignment: BTreeMap<RosterId, u32> = (1..=teams)
            .map(|n| (RosterId::from(format!("team{n}")), n))
            .collect();
        DraftConfiguration {
            season: "2025".to_string(),
            total_rounds: rounds,
            total_teams: teams,
            slot_assignment,
            draft_type: "snake".to_string(),
        }
    }

    fn completed(count: u32) -> Vec<CompletedPick> {
        (1..=count)
            .map(|n| CompletedPick {
                overall_pick_number: n,
                player_id: Some(format!("p{n}")),
            })
            .collect()
    }

    fn roster(slot: u32) -> RosterId {
        RosterId::from(format!("team{slot}"))
    }

    fn trade(round: u32, from: u32, to: u32) -> PickOwnershipTrade {
        PickOwnershipTrade {
            season: "2025".to_string(),
            round,
            previous_owner: roster(from),
            new_owner: roster(to),
        }
    }

    #[test]
    fn valid_assignment_covers_every_slot_once() {
        let cfg = league(12, 15);
        let mut slots: Vec<u32> = cfg.slot_assignment.values().copied().collect();
        slots.sort_unstable();
        assert_eq!(slots, (1..=12).collect::<Vec<_>>());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn non_bijective_assignment_fails_resolution() {
        let mut cfg = league(4, 3);
        cfg.slot_assignment.insert(roster(4), 1);
        let err = resolve_picks(&cfg, &[], &[], Some(&roster(1))).unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateSlot { slot: 1 });
    }

    #[test]
    fn absolute_numbers_cover_the_whole_draft_once() {
        let (teams, rounds) = (10, 7);
        let mut seen: Vec<u32> = (1..=rounds)
            .flat_map(|r| (1..=teams).map(move |p| absolute_pick_number(r, p, teams)))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=teams * rounds).collect::<Vec<_>>());
    }

    #[test]
    fn each_round_visits_every_slot_once() {
        let teams = 12;
        for round in 1..=4 {
            let mut slots: Vec<u32> = (1..=teams).map(|p| snake_slot(round, p, teams)).collect();
            slots.sort_unstable();
            assert_eq!(slots, (1..=teams).collect::<Vec<_>>(), "round {round}");
        }
        assert_eq!(snake_slot(1, 1, teams), 1);
        assert_eq!(snake_slot(2, 1, teams), 12);
        assert_eq!(snake_slot(2, 12, teams), 1);
        assert_eq!(snake_slot(3, 5, teams), 5);
    }

    #[test]
    fn resolution_is_idempotent() {
        let cfg = league(12, 15);
        let picks = completed(30);
        let trades = vec![trade(4, 7, 3), trade(6, 3, 9)];
        let first = resolve_picks(&cfg, &picks, &trades, Some(&roster(3))).unwrap();
        let second = resolve_picks(&cfg, &picks, &trades, Some(&roster(3))).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn completing_a_pick_advances_the_pointer_by_one() {
        let cfg = league(12, 15);
        let me = roster(12);

        let before = resolve_picks(&cfg, &completed(10), &[], Some(&me)).unwrap();
        assert_eq!(before.current_pick.absolute_pick_number, 11);
        assert_eq!(before.owned_picks[0].absolute_pick_number, 12);
        assert!(!before.owned_picks[0].is_next);

        let on_clock = resolve_picks(&cfg, &completed(11), &[], Some(&me)).unwrap();
        assert_eq!(on_clock.current_pick.absolute_pick_number, 12);
        assert!(on_clock.owned_picks[0].is_next);
        assert_eq!(on_clock.owned_picks[1].absolute_pick_number, 13);
        assert!(!on_clock.owned_picks[1].is_next);

        let turn = resolve_picks(&cfg, &completed(12), &[], Some(&me)).unwrap();
        assert_eq!(turn.current_pick.absolute_pick_number, 13);
        assert_eq!(turn.owned_picks[0].absolute_pick_number, 13);
        assert!(turn.owned_picks[0].is_next);
        assert_eq!(turn.owned_picks[0].picks_away, 0);
        assert!(turn.owned_picks.iter().skip(1).all(|p| !p.is_next));
    }

    #[test]
    fn first_slot_picks_from_an_empty_draft() {
        let cfg = league(12, 15);
        let res = resolve_picks(&cfg, &[], &[], Some(&roster(1))).unwrap();

        assert_eq!(
            res.current_pick,
            CurrentPick {
                round: 1,
                pick_in_round: 1,
                absolute_pick_number: 1,
                total_picks: 180
            }
        );
        let first = res.owned_picks[0];
        assert_eq!((first.round, first.pick_in_round, first.absolute_pick_number), (1, 1, 1));
        assert!(first.is_next);
        let second = res.owned_picks[1];
        assert_eq!((second.round, second.pick_in_round, second.absolute_pick_number), (2, 12, 24));
        assert_eq!(second.picks_away, 23);
        assert_eq!(res.owned_picks.len(), MAX_UPCOMING_PICKS);
        let numbers: Vec<u32> = res.owned_picks.iter().map(|p| p.absolute_pick_number).collect();
        assert_eq!(numbers, vec![1, 24, 25, 48, 49]);
    }

    #[test]
    fn end_of_first_round_points_at_pick_twelve() {
        let cfg = league(12, 15);
        let res = resolve_picks(&cfg, &completed(11), &[], Some(&roster(1))).unwrap();

        assert_eq!(res.current_pick.absolute_pick_number, 12);
        assert_eq!(res.current_pick.round, 1);
        assert_eq!(res.current_pick.pick_in_round, 12);

        let next = res.owned_picks[0];
        assert_eq!((next.round, next.pick_in_round, next.absolute_pick_number), (2, 12, 24));
        assert_eq!(next.picks_away, 12);
        assert!(!next.is_next);
    }

    #[test]
    fn traded_pick_moves_to_the_new_owner() {
        let cfg = league(12, 15);
        let trades = vec![trade(3, 5, 1)];

        let mine = resolve_picks(&cfg, &[], &trades, Some(&roster(1))).unwrap();
        let acquired: Vec<&ResolvedPick> = mine.owned_picks.iter().filter(|p| p.is_traded).collect();
        assert_eq!(acquired.len(), 1);
        assert_eq!(acquired[0].round, 3);
        assert_eq!(acquired[0].pick_in_round, 5);
        assert_eq!(acquired[0].absolute_pick_number, 29);

        let theirs = resolve_picks(&cfg, &[], &trades, Some(&roster(5))).unwrap();
        assert!(theirs.owned_picks.iter().all(|p| p.round != 3));
        assert_eq!(mine.traded_picks_count, 1);
    }

    #[test]
    fn completed_draft_reports_one_past_the_end() {
        let cfg = league(12, 15);
        let res = resolve_picks(&cfg, &completed(180), &[], Some(&roster(1))).unwrap();

        assert!(res.owned_picks.is_empty());
        assert!(res.is_draft_complete());
        assert_eq!(res.current_pick.absolute_pick_number, 181);
        assert_eq!(res.current_pick.total_picks, 180);
    }

    #[test]
    fn overfull_pick_list_degrades_to_complete() {
        let cfg = league(4, 2);
        let res = resolve_picks(&cfg, &completed(20), &[], Some(&roster(1))).unwrap();
        assert!(res.is_draft_complete());
        assert!(res.owned_picks.is_empty());
    }

    #[test]
    fn unfilled_pick_slots_do_not_advance_the_pointer() {
        let cfg = league(12, 15);
        let mut picks = completed(3);
        picks.push(CompletedPick {
            overall_pick_number: 4,
            player_id: None,
        });
        picks.reverse();
        let res = resolve_picks(&cfg, &picks, &[], None).unwrap();
        assert_eq!(res.current_pick.absolute_pick_number, 4);
    }

    #[test]
    fn missing_requester_returns_summary_only() {
        let cfg = league(12, 15);
        let res = resolve_picks(&cfg, &completed(5), &[], None).unwrap();
        assert_eq!(res.current_pick.absolute_pick_number, 6);
        assert!(res.owned_picks.is_empty());

        let stranger = RosterId::from("nobody");
        let res = resolve_picks(&cfg, &completed(5), &[], Some(&stranger)).unwrap();
        assert!(res.owned_picks.is_empty());
    }

    #[test]
    fn trades_are_not_chained() {
        let cfg = league(12, 15);
        // Slot 5's round-3 pick goes to 1, then "1 -> 9" refers to slot 1's own pick.
        let trades = vec![trade(3, 5, 1), trade(3, 1, 9)];

        let first_hop = resolve_picks(&cfg, &[], &trades, Some(&roster(1))).unwrap();
        assert!(first_hop.owned_picks.iter().any(|p| p.round == 3 && p.pick_in_round == 5));
        assert!(!first_hop.owned_picks.iter().any(|p| p.round == 3 && p.pick_in_round == 1));

        let second_hop = resolve_picks(&cfg, &[], &trades, Some(&roster(9))).unwrap();
        assert!(second_hop.owned_picks.iter().any(|p| p.round == 3 && p.pick_in_round == 1));
        assert!(!second_hop.owned_picks.iter().any(|p| p.round == 3 && p.pick_in_round == 5));
    }

    #[test]
    fn other_season_trades_are_ignored() {
        let cfg = league(12, 15);
        let mut future = trade(2, 1, 4);
        future.season = "2026".to_string();
        future.new_owner = RosterId::from("not-in-this-draft");

        let res = resolve_picks(&cfg, &[], &[future], Some(&roster(1))).unwrap();
        assert!(res.owned_picks.iter().all(|p| !p.is_traded));
        assert_eq!(res.owned_picks[1].absolute_pick_number, 24);
        assert_eq!(res.traded_picks_count, 1);
    }

    #[test]
    fn trade_to_unknown_roster_is_a_configuration_error() {
        let cfg = league(12, 15);
        let mut bad = trade(2, 1, 4);
        bad.new_owner = RosterId::from("ghost");
        let err = resolve_picks(&cfg, &[], &[bad], Some(&roster(1))).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownTradeRoster {
                round: 2,
                roster: RosterId::from("ghost")
            }
        );
    }

    #[test]
    fn trade_past_the_last_round_is_a_configuration_error() {
        let cfg = league(12, 3);
        let err = resolve_picks(&cfg, &[], &[trade(4, 1, 2)], Some(&roster(1))).unwrap_err();
        assert_eq!(err, ConfigurationError::TradeRoundOutOfRange { round: 4, rounds: 3 });
    }

    #[test]
    fn unset_draft_order_yields_no_owned_picks() {
        let mut cfg = league(12, 15);
        cfg.slot_assignment.clear();
        let res = resolve_picks(&cfg, &completed(2), &[], Some(&roster(1))).unwrap();
        assert_eq!(res.current_pick.absolute_pick_number, 3);
        assert!(res.owned_picks.is_empty());
    }

    #[test]
    fn first_matching_trade_wins() {
        let cfg = league(12, 15);
        let trades = vec![trade(3, 5, 1), trade(3, 5, 9)];

        let winner = resolve_picks(&cfg, &[], &trades, Some(&roster(1))).unwrap();
        assert!(winner.owned_picks.iter().any(|p| p.absolute_pick_number == 29 && p.is_traded));

        let loser = resolve_picks(&cfg, &[], &trades, Some(&roster(9))).unwrap();
        assert!(loser.owned_picks.iter().all(|p| p.absolute_pick_number != 29));
    }

    #[test]
    fn round_zero_trade_is_a_configuration_error() {
        let cfg = league(12, 15);
        let err = resolve_picks(&cfg, &[], &[trade(0, 5, 1)], Some(&roster(1))).unwrap_err();
        assert_eq!(err, ConfigurationError::TradeRoundOutOfRange { round: 0, rounds: 15 });
    }
}
