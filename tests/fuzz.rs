use gauntlet_prog::engine::{
    EngineParams, GauntletEngine, NoOpModifier, TierParams, SCAN_COMMITTED, SCAN_VERIFYING,
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

fn default_engine_params() -> EngineParams {
    EngineParams {
        epoch_duration_slots: 50_000,
        extend_window_slots: 500,
        extend_by_slots: 1_000,
        num_tiers: 3,
        _padding: [0; 7],
    }
}

fn default_tier_params(rate_bps: u16) -> TierParams {
    TierParams {
        scan_interval_slots: 400,
        lock_duration_slots: 50,
        reveal_delay_slots: 10,
        submission_window_slots: 30,
        min_stake: 10,
        base_elimination_rate_bps: rate_bps,
        max_positions: 32,
        burn_share_bps: 2000,
        survivor_share_bps: 6000,
    }
}

/// Run a full scan round for one tier with synthetic entropy, submitting
/// every alive position and ignoring draw mismatches.
fn run_scan_round(engine: &mut GauntletEngine, tier: u8, rng: &mut XorShiftRng, now: &mut u64) {
    let t = tier as usize;
    if engine.scans[t].phase == SCAN_COMMITTED || engine.scans[t].phase == SCAN_VERIFYING {
        return;
    }
    if *now < engine.tiers[t].next_scan_at {
        return;
    }
    if engine.commit_scan(tier, *now).is_err() {
        return;
    }

    *now = engine.scans[t].entropy_slot + 1;
    let mut entropy = [0u8; 32];
    rng.fill(&mut entropy);
    engine.capture_entropy(tier, entropy, *now).unwrap();

    let candidates: Vec<u16> = (0..gauntlet_prog::engine::MAX_POSITIONS)
        .filter(|&i| {
            engine.is_used(i)
                && engine.positions[i].alive == 1
                && engine.positions[i].tier == tier
        })
        .map(|i| i as u16)
        .collect();
    for idx in candidates {
        let _ = engine.submit_elimination(tier, idx, &NoOpModifier, *now);
    }

    *now = engine.scans[t].submission_deadline_slot + 1;
    engine.finalize_scan(tier, *now).unwrap();
}

#[test]
fn deterministic_fuzz_simulation() {
    let seed = [0xabu8; 16];
    let mut rng = XorShiftRng::from_seed(seed);

    let mut engine = GauntletEngine::new(default_engine_params(), 100);
    engine.init_tier(0, default_tier_params(300), 100).unwrap();
    engine.init_tier(1, default_tier_params(1_500), 100).unwrap();
    engine.init_tier(2, default_tier_params(5_000), 100).unwrap();

    let mut now = 100u64;
    let mut next_nonce = 1u64;

    for i in 0..2_000 {
        now += rng.gen_range(1..20);
        let op: u8 = rng.gen_range(0..8);
        let owner = [rng.gen_range(1..40u8); 32];

        match op {
            0 => {
                // Deposit
                let tier = rng.gen_range(0..3u8);
                let amount = rng.gen_range(10..100_000u128);
                let _ = engine.deposit(owner, tier, amount, now);
            }
            1 => {
                // TopUp
                if let Some(idx) = engine.find_alive_by_owner(&owner) {
                    let amount = rng.gen_range(1..10_000u128);
                    let _ = engine.top_up(idx, amount, now);
                }
            }
            2 => {
                // Withdraw
                if let Some(idx) = engine.find_alive_by_owner(&owner) {
                    let _ = engine.withdraw(idx, now);
                }
            }
            3 => {
                // ClaimReward
                if let Some(idx) = engine.find_alive_by_owner(&owner) {
                    let _ = engine.claim_reward(idx);
                }
            }
            4 => {
                // CreditEmission
                let tier = rng.gen_range(0..3u8);
                let amount = rng.gen_range(1..50_000u128);
                let _ = engine.credit_emission(tier, amount);
            }
            5 => {
                // ApplyBoost
                if let Some(idx) = engine.find_alive_by_owner(&owner) {
                    let cut = rng.gen_range(0..=10_000u16);
                    let expiry = now + rng.gen_range(1..2_000u64);
                    if engine.apply_boost(idx, 0, cut, expiry, next_nonce, now).is_ok() {
                        next_nonce += 1;
                    }
                }
            }
            6 => {
                // Scan round
                let tier = rng.gen_range(0..3u8);
                run_scan_round(&mut engine, tier, &mut rng, &mut now);
            }
            7 => {
                // Reap a random dead record
                let idx = rng.gen_range(0..gauntlet_prog::engine::MAX_POSITIONS) as u16;
                let _ = engine.reap(idx);
            }
            _ => {}
        }

        assert!(
            engine.check_conservation(),
            "conservation violated at step {} (op {})",
            i,
            op
        );
    }

    // The run must have actually exercised scans.
    assert!(engine.next_scan_id > 1);
    assert!(engine.next_position_id > 1);
}
