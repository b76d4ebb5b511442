//! Shared fixtures: a seeded state generator and a small rules engine.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tactica::board::{
    Action, BoardSize, Capabilities, GameState, Phase, Position, Side, Status, Stratagem,
    StratagemId, Unit, UnitId, ALL_PHASES,
};
use tactica::search::ApplyError;

/// Generates a valid random state. Unit ids are unique across sides and
/// every attribute stays within the default schema caps.
pub fn random_state(rng: &mut StdRng) -> GameState {
    let board = BoardSize::new(rng.gen_range(4..=48), rng.gen_range(4..=48));
    let mut b = GameState::builder(board)
        .turn(rng.gen_range(1..=20))
        .phase(ALL_PHASES[rng.gen_range(0..ALL_PHASES.len())])
        .active_side(if rng.gen_bool(0.5) { Side::One } else { Side::Two })
        .victory_points(Side::One, rng.gen_range(0..=200))
        .victory_points(Side::Two, rng.gen_range(0..=200))
        .command_points(Side::One, rng.gen_range(0..=20))
        .command_points(Side::Two, rng.gen_range(0..=20));

    let mut next_id = 1u32;
    for side in [Side::One, Side::Two] {
        for _ in 0..rng.gen_range(0..=8) {
            let max_health = rng.gen_range(1..=64);
            let health = rng.gen_range(0..=max_health);
            let pos = Position::new(rng.gen_range(0..board.width), rng.gen_range(0..board.height));
            let unit = Unit::new(UnitId(next_id), side, pos, health, max_health, rng.gen_range(0..=1000))
                .unwrap()
                .with_move_range(rng.gen_range(0..=4))
                .with_status(Status {
                    engaged: rng.gen_bool(0.2),
                    has_acted: rng.gen_bool(0.2),
                    routed: rng.gen_bool(0.1),
                })
                .with_capabilities(Capabilities {
                    can_move: rng.gen_bool(0.9),
                    can_shoot: rng.gen_bool(0.8),
                    can_charge: rng.gen_bool(0.8),
                    can_fight: rng.gen_bool(0.9),
                });
            next_id += 1;
            b = b.unit(unit);
        }
        for i in 0..rng.gen_range(0..=2u16) {
            b = b.stratagem(Stratagem {
                id: StratagemId(side.index() as u16 * 10 + i),
                side,
                cost: rng.gen_range(0..=3),
                phase: ALL_PHASES[rng.gen_range(0..ALL_PHASES.len())],
            });
        }
    }
    for _ in 0..rng.gen_range(0..=3) {
        b = b.objective(Position::new(rng.gen_range(0..board.width), rng.gen_range(0..board.height)));
    }
    b.build().unwrap()
}

pub fn corpus(seed: u64, n: usize) -> Vec<GameState> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| random_state(&mut rng)).collect()
}

/// Minimal rules: moves relocate, shots and fights deal 1 damage, charges
/// engage both units, stratagems spend their cost, `Pass` advances the
/// phase. The acting unit is marked as having acted.
pub fn sandbox_rules(state: &GameState, action: &Action) -> Result<GameState, ApplyError> {
    let mut b = state.to_builder();
    let actor = match action.unit() {
        Some(id) => Some(state.unit(id).ok_or("unknown unit")?.clone()),
        None => None,
    };
    let acted = |u: Unit| {
        let mut st = u.status();
        st.has_acted = true;
        u.with_status(st)
    };
    match *action {
        Action::Pass => {
            b = b.phase(state.phase().next());
            if state.phase() == Phase::Fight {
                b = b.active_side(state.active_side().opponent());
                if state.active_side() == Side::Two {
                    b = b.turn(state.turn() + 1);
                }
            }
        }
        Action::Move { to, .. } => {
            let u = actor.ok_or("move without unit")?;
            b = b.update_unit(acted(u.with_position(to)));
        }
        Action::Shoot { target, .. } | Action::Fight { target, .. } => {
            let t = state.unit(target).ok_or("unknown target")?;
            b = b.update_unit(t.clone().with_health(t.health().saturating_sub(1))?);
            b = b.update_unit(acted(actor.ok_or("attack without unit")?));
        }
        Action::Charge { target, .. } => {
            let engage = |u: Unit| {
                let mut st = u.status();
                st.engaged = true;
                u.with_status(st)
            };
            let t = state.unit(target).ok_or("unknown target")?;
            b = b.update_unit(engage(t.clone()));
            b = b.update_unit(acted(engage(actor.ok_or("charge without unit")?)));
        }
        Action::UseStratagem { stratagem, .. } => {
            let s = state
                .stratagems()
                .iter()
                .find(|s| s.id == stratagem)
                .ok_or("unknown stratagem")?;
            let side = state.active_side();
            b = b.command_points(side, state.command_points(side).saturating_sub(s.cost));
            b = b.update_unit(acted(actor.ok_or("stratagem without unit")?));
        }
    }
    Ok(b.build()?)
}
