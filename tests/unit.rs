//! Engine-level tests: ledger bookkeeping, scan lifecycle, cascade
//! arithmetic and the epoch clock, exercised without the account layer.

use gauntlet_prog::engine::{
    draw, EngineParams, GauntletEngine, LedgerError, NoOpModifier, TierParams, SCAN_FINALIZED,
    SCAN_VERIFYING,
};

fn engine_params(num_tiers: u8) -> EngineParams {
    EngineParams {
        epoch_duration_slots: 10_000,
        extend_window_slots: 100,
        extend_by_slots: 200,
        num_tiers,
        _padding: [0; 7],
    }
}

fn tier_params(rate_bps: u16) -> TierParams {
    TierParams {
        scan_interval_slots: 1000,
        lock_duration_slots: 100,
        reveal_delay_slots: 10,
        submission_window_slots: 50,
        min_stake: 10,
        base_elimination_rate_bps: rate_bps,
        max_positions: 16,
        burn_share_bps: 3000,
        survivor_share_bps: 5000,
    }
}

/// Engine with three tiers enabled at slot 100, scans due at 1100.
fn engine3(rates: [u16; 3]) -> GauntletEngine {
    let mut e = GauntletEngine::new(engine_params(3), 100);
    for (t, rate) in rates.iter().enumerate() {
        e.init_tier(t as u8, tier_params(*rate), 100).unwrap();
    }
    e
}

fn owner(n: u8) -> [u8; 32] {
    [n; 32]
}

fn find_entropy(pid: u64, rate_bps: u16, want_eliminated: bool) -> [u8; 32] {
    for i in 0u64..100_000 {
        let mut e = [0u8; 32];
        e[0..8].copy_from_slice(&i.to_le_bytes());
        if draw::is_eliminated(&e, pid, rate_bps) == want_eliminated {
            return e;
        }
    }
    panic!("no entropy found");
}

/// Commit at the due slot and capture the given entropy one slot after the
/// entropy slot. Returns the first slot inside the submission window.
fn start_scan(e: &mut GauntletEngine, tier: u8, entropy: [u8; 32]) -> u64 {
    let due = e.tiers[tier as usize].next_scan_at;
    e.commit_scan(tier, due).unwrap();
    let es = e.scans[tier as usize].entropy_slot;
    e.capture_entropy(tier, entropy, es + 1).unwrap();
    assert_eq!(e.scans[tier as usize].phase, SCAN_VERIFYING);
    es + 1
}

fn past_deadline(e: &GauntletEngine, tier: u8) -> u64 {
    e.scans[tier as usize].submission_deadline_slot + 1
}

// --- Draw ---

#[test]
fn draw_is_deterministic_and_bounded() {
    let entropy = [42u8; 32];
    let a = draw::roll(&entropy, 7);
    let b = draw::roll(&entropy, 7);
    assert_eq!(a, b);
    assert!(a < 10_000);
    assert_ne!(draw::roll(&entropy, 7), draw::roll(&entropy, 8));

    assert!(!draw::is_eliminated(&entropy, 7, 0));
    assert!(draw::is_eliminated(&entropy, 7, 10_000));
}

#[test]
fn draw_frequency_tracks_rate() {
    let entropy = [13u8; 32];
    let mut eliminated = 0u32;
    for pid in 0u64..10_000 {
        if draw::is_eliminated(&entropy, pid, 500) {
            eliminated += 1;
        }
    }
    // 5% expected over 10_000 draws.
    assert!(eliminated > 300, "too few: {}", eliminated);
    assert!(eliminated < 700, "too many: {}", eliminated);
}

// --- Rewards ---

#[test]
fn accumulator_distributes_pro_rata() {
    let mut e = engine3([500, 500, 500]);
    let i1 = e.deposit(owner(1), 0, 100, 200).unwrap();
    let i2 = e.deposit(owner(2), 0, 300, 200).unwrap();

    assert!(e.credit_emission(0, 400).unwrap());
    assert_eq!(e.claim_reward(i1).unwrap(), 100);
    assert_eq!(e.claim_reward(i2).unwrap(), 300);
    assert_eq!(e.claim_reward(i1).unwrap(), 0);
    assert!(e.check_conservation());
}

#[test]
fn top_up_settles_before_changing_stake() {
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();

    assert!(e.credit_emission(0, 100).unwrap());
    e.top_up(idx, 100, 210).unwrap();
    assert!(e.credit_emission(0, 200).unwrap());

    // First credit against 100 staked, second against 200: both in full.
    assert_eq!(e.claim_reward(idx).unwrap(), 300);
    assert!(e.check_conservation());
}

#[test]
fn emission_to_empty_tier_is_refused_without_error() {
    let mut e = engine3([500, 500, 500]);
    assert!(!e.credit_emission(1, 50).unwrap());
    assert_eq!(e.vault.get(), 0);
    assert!(e.check_conservation());
}

// --- Withdraw / lock window ---

#[test]
fn withdraw_lock_window_boundaries() {
    // next_scan_at = 1100, lock = 100 => locked in [1000, 1100).
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    assert_eq!(e.withdraw(idx, 1000), Err(LedgerError::Locked));
    assert_eq!(e.withdraw(idx, 1099), Err(LedgerError::Locked));
    assert_eq!(e.withdraw(idx, 999).unwrap(), 100);
    assert!(e.check_conservation());

    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    // At the boundary the scan is merely due, not committed.
    assert_eq!(e.withdraw(idx, 1100).unwrap(), 100);
}

#[test]
fn withdraw_blocked_while_scan_in_flight() {
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    e.commit_scan(0, 1100).unwrap();
    assert_eq!(e.withdraw(idx, 1105), Err(LedgerError::Locked));
}

#[test]
fn withdraw_pays_principal_plus_rewards() {
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    assert!(e.credit_emission(0, 40).unwrap());
    assert_eq!(e.withdraw(idx, 500).unwrap(), 140);
    assert_eq!(e.vault.get(), 0);
    assert_eq!(e.num_used, 0);
    assert!(e.check_conservation());
}

// --- Scan lifecycle ---

#[test]
fn all_in_elimination_cascades_upstream() {
    // Tier 1 eliminates everyone; tier 0 holds the upstream stake.
    let mut e = engine3([0, 10_000, 500]);
    let safe = e.deposit(owner(9), 0, 1000, 200).unwrap();
    let mut victims = Vec::new();
    for n in 1..=4u8 {
        victims.push(e.deposit(owner(n), 1, 100, 200).unwrap());
    }

    let now = start_scan(&mut e, 1, [7u8; 32]);
    for idx in &victims {
        assert!(e.submit_elimination(1, *idx, &NoOpModifier, now).unwrap());
    }
    assert!(e.check_conservation());

    let outcome = e.finalize_scan(1, past_deadline(&e, 1)).unwrap();
    assert_eq!(outcome.total, 400);
    assert_eq!(outcome.burned, 120);
    assert_eq!(outcome.same_tier, 0);
    assert_eq!(
        outcome.burned + outcome.same_tier + outcome.upstream + outcome.revenue,
        outcome.total
    );
    assert_eq!(outcome.eliminated, 4);
    assert_eq!(outcome.survivors, 0);
    assert_eq!(e.scans[1].phase, SCAN_FINALIZED);

    // Upstream share reaches the tier-0 staker.
    assert_eq!(e.claim_reward(safe).unwrap(), outcome.upstream);
    assert!(e.check_conservation());
}

#[test]
fn survivor_share_stays_in_tier_when_survivors_exist() {
    let mut e = engine3([500, 500, 500]);
    let a = e.deposit(owner(1), 0, 100, 200).unwrap();
    let b = e.deposit(owner(2), 0, 100, 200).unwrap();

    let pid_a = e.positions[a as usize].position_id;
    let entropy = find_entropy(pid_a, 500, true);
    let now = start_scan(&mut e, 0, entropy);

    // Submit only the position the chosen entropy actually eliminates.
    assert!(e.submit_elimination(0, a, &NoOpModifier, now).unwrap());
    let outcome = e.finalize_scan(0, past_deadline(&e, 0)).unwrap();

    if e.positions[b as usize].alive == 1 {
        assert_eq!(outcome.upstream, 0);
        // b absorbs the survivor share (minus fixed-point dust).
        let claimed = e.claim_reward(b).unwrap();
        assert_eq!(claimed, outcome.same_tier);
        assert_eq!(e.positions[b as usize].streak, 1);
    }
    assert_eq!(
        outcome.burned + outcome.same_tier + outcome.upstream + outcome.revenue,
        outcome.total
    );
    assert!(e.check_conservation());
}

#[test]
fn eliminated_value_includes_settled_rewards() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    assert!(e.credit_emission(0, 50).unwrap());

    let now = start_scan(&mut e, 0, [3u8; 32]);
    assert!(e.submit_elimination(0, idx, &NoOpModifier, now).unwrap());
    assert_eq!(e.scans[0].total_value_eliminated.get(), 150);
    assert_eq!(e.claimable_total.get(), 0);
    assert!(e.check_conservation());
}

#[test]
fn duplicate_submission_is_silently_skipped() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    let now = start_scan(&mut e, 0, [3u8; 32]);
    assert!(e.submit_elimination(0, idx, &NoOpModifier, now).unwrap());
    assert!(!e.submit_elimination(0, idx, &NoOpModifier, now).unwrap());
    assert_eq!(e.scans[0].eliminated_count, 1);
}

#[test]
fn fabricated_elimination_is_rejected() {
    let mut e = engine3([0, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    let now = start_scan(&mut e, 0, [3u8; 32]);
    assert_eq!(
        e.submit_elimination(0, idx, &NoOpModifier, now),
        Err(LedgerError::DrawMismatch)
    );
    assert_eq!(e.positions[idx as usize].alive, 1);
}

#[test]
fn submission_window_closes() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    start_scan(&mut e, 0, [3u8; 32]);
    let late = e.scans[0].submission_deadline_slot + 1;
    assert_eq!(
        e.submit_elimination(0, idx, &NoOpModifier, late),
        Err(LedgerError::SubmissionClosed)
    );
    // Finalize still works after the window.
    let outcome = e.finalize_scan(0, late).unwrap();
    assert_eq!(outcome.eliminated, 0);
}

#[test]
fn unreachable_entropy_finalizes_with_no_eliminations() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    e.commit_scan(0, 1100).unwrap();
    let es = e.scans[0].entropy_slot;

    // Within the SlotHashes retention horizon: still waiting.
    assert_eq!(
        e.finalize_scan(0, es + 512),
        Err(LedgerError::EntropyNotReady)
    );

    let outcome = e.finalize_scan(0, es + 513).unwrap();
    assert_eq!(outcome.total, 0);
    assert_eq!(outcome.eliminated, 0);
    assert_eq!(e.positions[idx as usize].alive, 1);
    assert_eq!(e.positions[idx as usize].streak, 1);
    assert_eq!(e.tiers[0].next_scan_at, 2100);
    assert!(e.check_conservation());
}

#[test]
fn scan_cannot_be_committed_twice() {
    let mut e = engine3([500, 500, 500]);
    e.deposit(owner(1), 0, 100, 200).unwrap();
    e.commit_scan(0, 1100).unwrap();
    assert_eq!(e.commit_scan(0, 1200), Err(LedgerError::ScanAlreadyActive));
    assert_eq!(e.commit_scan(0, 1100), Err(LedgerError::ScanAlreadyActive));
}

#[test]
fn capture_requires_entropy_slot_passed() {
    let mut e = engine3([500, 500, 500]);
    e.commit_scan(0, 1100).unwrap();
    let es = e.scans[0].entropy_slot;
    assert_eq!(
        e.capture_entropy(0, [1u8; 32], es),
        Err(LedgerError::EntropyNotReady)
    );
    e.capture_entropy(0, [1u8; 32], es + 1).unwrap();
}

// --- Boosts ---

#[test]
fn boost_cut_shields_from_elimination() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    // Full rate cut: effective rate 0 while the boost is active.
    e.apply_boost(idx, 0, 10_000, 5_000, 1, 200).unwrap();

    let now = start_scan(&mut e, 0, [3u8; 32]);
    assert_eq!(
        e.submit_elimination(0, idx, &NoOpModifier, now),
        Err(LedgerError::DrawMismatch)
    );
    assert_eq!(e.positions[idx as usize].alive, 1);
}

#[test]
fn expired_boost_has_no_effect() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    // Expires before the scan's submission window opens.
    e.apply_boost(idx, 0, 10_000, 1_000, 1, 200).unwrap();

    let now = start_scan(&mut e, 0, [3u8; 32]);
    assert!(now > 1_000);
    assert!(e.submit_elimination(0, idx, &NoOpModifier, now).unwrap());
}

#[test]
fn nonce_watermark_is_strictly_increasing() {
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    e.apply_boost(idx, 0, 100, 5_000, 5, 200).unwrap();
    assert_eq!(
        e.apply_boost(idx, 0, 100, 5_000, 5, 200),
        Err(LedgerError::NonceReused)
    );
    assert_eq!(
        e.apply_boost(idx, 0, 100, 5_000, 3, 200),
        Err(LedgerError::NonceReused)
    );
    e.apply_boost(idx, 0, 100, 5_000, 6, 200).unwrap();
    assert_eq!(e.grant_nonce_high, 6);
}

// --- Safety controls ---

#[test]
fn emergency_withdraw_forfeits_rewards_to_revenue() {
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    assert!(e.credit_emission(0, 60).unwrap());

    assert_eq!(e.emergency_withdraw(idx), Err(LedgerError::NotPaused));
    e.pause().unwrap();
    assert_eq!(e.emergency_withdraw(idx).unwrap(), 100);
    assert_eq!(e.protocol_revenue.get(), 60);
    assert_eq!(e.vault.get(), 60);
    assert!(e.check_conservation());
}

#[test]
fn paused_blocks_scan_and_ledger_ops() {
    let mut e = engine3([500, 500, 500]);
    e.deposit(owner(1), 0, 100, 200).unwrap();
    e.pause().unwrap();
    assert_eq!(e.pause(), Err(LedgerError::Paused));
    assert_eq!(e.deposit(owner(2), 0, 100, 200), Err(LedgerError::Paused));
    assert_eq!(e.commit_scan(0, 1100), Err(LedgerError::Paused));
    e.unpause().unwrap();
    assert_eq!(e.unpause(), Err(LedgerError::NotPaused));
    e.commit_scan(0, 1100).unwrap();
}

#[test]
fn collect_revenue_is_bounded() {
    let mut e = engine3([500, 500, 500]);
    e.deposit(owner(1), 0, 10, 200).unwrap();
    e.deposit(owner(2), 0, 20, 200).unwrap();
    // 50 over 30 staked floors to 49 distributed; 1 unit of dust in revenue.
    assert!(e.credit_emission(0, 50).unwrap());
    assert_eq!(e.protocol_revenue.get(), 1);
    assert_eq!(e.collect_revenue(2), Err(LedgerError::InsufficientRevenue));
    e.collect_revenue(1).unwrap();
    assert_eq!(e.protocol_revenue.get(), 0);
    assert!(e.check_conservation());
}

// --- Slab hygiene ---

#[test]
fn reap_requires_dead_record() {
    let mut e = engine3([10_000, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    assert_eq!(e.reap(idx), Err(LedgerError::PositionAlive));

    let now = start_scan(&mut e, 0, [3u8; 32]);
    assert!(e.submit_elimination(0, idx, &NoOpModifier, now).unwrap());
    e.finalize_scan(0, past_deadline(&e, 0)).unwrap();

    e.reap(idx).unwrap();
    assert_eq!(e.reap(idx), Err(LedgerError::PositionNotFound));
    assert_eq!(e.num_used, 0);
    assert!(e.check_conservation());
}

#[test]
fn freed_slot_is_recycled_with_fresh_id() {
    let mut e = engine3([500, 500, 500]);
    let idx = e.deposit(owner(1), 0, 100, 200).unwrap();
    let first_id = e.positions[idx as usize].position_id;
    e.withdraw(idx, 500).unwrap();

    let idx2 = e.deposit(owner(1), 0, 100, 600).unwrap();
    assert_eq!(idx, idx2);
    assert!(e.positions[idx2 as usize].position_id > first_id);
}

#[test]
fn owner_may_hold_one_alive_position() {
    let mut e = engine3([500, 500, 500]);
    e.deposit(owner(1), 0, 100, 200).unwrap();
    assert_eq!(
        e.deposit(owner(1), 1, 100, 200),
        Err(LedgerError::PositionExists)
    );
}

#[test]
fn tier_capacity_is_enforced() {
    let mut e = engine3([500, 500, 500]);
    let mut params = tier_params(500);
    params.max_positions = 2;
    e.update_tier_params(0, params).unwrap();

    e.deposit(owner(1), 0, 100, 200).unwrap();
    e.deposit(owner(2), 0, 100, 200).unwrap();
    assert_eq!(e.deposit(owner(3), 0, 100, 200), Err(LedgerError::TierFull));
}

// --- Epoch clock ---

#[test]
fn late_deposit_extends_epoch_deadline() {
    let mut e = engine3([500, 500, 500]);
    assert_eq!(e.epoch_reset_deadline, 10_100);
    // Inside the extend window (deadline - 100).
    e.deposit(owner(1), 0, 100, 10_050).unwrap();
    assert_eq!(e.epoch_reset_deadline, 10_300);

    assert_eq!(e.advance_epoch(10_250), Err(LedgerError::ResetNotReady));
    assert_eq!(e.advance_epoch(10_300).unwrap(), 1);
    assert_eq!(e.epoch_reset_deadline, 20_300);
}

// --- Config validation ---

#[test]
fn invalid_configurations_are_rejected_at_write_time() {
    let mut bad = engine_params(0);
    assert_eq!(
        GauntletEngine::validate_engine_params(&bad),
        Err(LedgerError::InvalidParams)
    );
    bad.num_tiers = 9;
    assert_eq!(
        GauntletEngine::validate_engine_params(&bad),
        Err(LedgerError::InvalidParams)
    );

    let mut e = engine3([500, 500, 500]);

    let mut p = tier_params(500);
    p.burn_share_bps = 6000;
    p.survivor_share_bps = 6000;
    assert_eq!(e.update_tier_params(0, p), Err(LedgerError::InvalidParams));

    let mut p = tier_params(500);
    p.scan_interval_slots = 0;
    assert_eq!(e.update_tier_params(0, p), Err(LedgerError::InvalidParams));

    let mut p = tier_params(500);
    p.max_positions = 0;
    assert_eq!(e.update_tier_params(0, p), Err(LedgerError::InvalidParams));

    let mut p = tier_params(10_001);
    assert_eq!(e.update_tier_params(0, p), Err(LedgerError::InvalidParams));
    p.base_elimination_rate_bps = 10_000;
    e.update_tier_params(0, p).unwrap();

    assert_eq!(
        e.init_tier(0, tier_params(500), 100),
        Err(LedgerError::TierExists)
    );
    assert_eq!(
        e.init_tier(3, tier_params(500), 100),
        Err(LedgerError::InvalidTier)
    );
}
