//! Gauntlet: Single-file Solana program with embedded staking ledger and
//! elimination-scan engine.
//!
//! Participants stake collateral into ordered risk tiers. At fixed intervals a
//! tier is scanned: a scan commits to a future slot, captures that slot's hash
//! from the SlotHashes sysvar as entropy once it lands, verifies keeper-submitted
//! eliminations against a deterministic draw, and on finalize redistributes the
//! eliminated value (burn / survivors / safer tier / protocol revenue).

#[cfg(not(feature = "no-entrypoint"))]
solana_security_txt::security_txt! {
    name: "Gauntlet",
    project_url: "https://github.com/gauntlet-staking/gauntlet-prog",
    contacts: "email:security@gauntlet-staking.io",
    policy: "https://github.com/gauntlet-staking/gauntlet-prog/blob/main/SECURITY.md"
}

// 1. mod constants
pub mod constants {
    use crate::engine::GauntletEngine;
    use crate::state::GauntletConfig;
    use core::mem::{align_of, size_of};

    pub const MAGIC: u64 = 0x4741554E544C4554; // "GAUNTLET"
    pub const VERSION: u32 = 1;

    pub const HEADER_LEN: usize = 64;
    pub const CONFIG_LEN: usize = size_of::<GauntletConfig>();
    pub const ENGINE_ALIGN: usize = align_of::<GauntletEngine>();

    pub const fn align_up(x: usize, a: usize) -> usize {
        (x + (a - 1)) & !(a - 1)
    }

    pub const ENGINE_OFF: usize = align_up(HEADER_LEN + CONFIG_LEN, ENGINE_ALIGN);
    pub const ENGINE_LEN: usize = size_of::<GauntletEngine>();
    pub const SLAB_LEN: usize = ENGINE_OFF + ENGINE_LEN;

    /// Canonical boost-grant message: owner(32) | kind(1) | magnitude_bps(2 LE)
    /// | expiry_slot(8 LE) | nonce(8 LE).
    pub const GRANT_MSG_LEN: usize = 51;
}

// 2. mod engine (position ledger + scan engine, pure state machine over the slab)
pub mod engine {
    /// Number of position slots in the slab.
    /// Feature-configured, not target-configured, so x86 and SBF builds agree.
    #[cfg(feature = "test")]
    pub const MAX_POSITIONS: usize = 64;
    #[cfg(not(feature = "test"))]
    pub const MAX_POSITIONS: usize = 1024;

    pub const BITMAP_WORDS: usize = (MAX_POSITIONS + 63) / 64;

    /// Number of risk tiers the slab can hold. Tier 0 is the safest.
    pub const MAX_TIERS: usize = 8;

    /// Basis-point denominator for all rate arithmetic.
    pub const BPS_DENOM: u64 = 10_000;

    /// Fixed-point scale of the per-stake-unit reward accumulator.
    pub const ACC_SCALE: u128 = 1_000_000_000_000;

    /// SlotHashes retains this many recent slots. A committed scan whose
    /// entropy slot has fallen out of the sysvar can never be verified and
    /// becomes finalizable with zero eliminations.
    pub const ENTROPY_TTL_SLOTS: u64 = 512;

    /// The only grant kind currently defined: a cut of the effective
    /// elimination rate, in basis points of the base rate.
    pub const BOOST_KIND_RATE_CUT: u8 = 0;

    // Scan phases
    pub const SCAN_NONE: u8 = 0;
    pub const SCAN_COMMITTED: u8 = 1;
    pub const SCAN_VERIFYING: u8 = 2;
    pub const SCAN_FINALIZED: u8 = 3;

    // ========================================================================
    // BPF-safe u128
    // ========================================================================

    /// BPF-safe unsigned 128-bit integer stored as [lo, hi] u64 words.
    ///
    /// Rust 1.77+ aligns u128 to 16 bytes on x86_64 while SBF stays at 8;
    /// the wrapper keeps the slab layout identical on both targets.
    #[repr(C)]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct U128([u64; 2]);

    impl U128 {
        pub const ZERO: Self = Self([0, 0]);

        #[inline(always)]
        pub const fn new(v: u128) -> Self {
            Self([v as u64, (v >> 64) as u64])
        }

        #[inline(always)]
        pub const fn get(self) -> u128 {
            (self.0[0] as u128) | ((self.0[1] as u128) << 64)
        }

        #[inline(always)]
        pub fn set(&mut self, v: u128) {
            *self = Self::new(v);
        }

        #[inline(always)]
        pub fn is_zero(self) -> bool {
            self.0[0] == 0 && self.0[1] == 0
        }
    }

    impl core::ops::Add<u128> for U128 {
        type Output = U128;
        fn add(self, rhs: u128) -> U128 {
            U128::new(self.get().saturating_add(rhs))
        }
    }

    impl core::ops::Sub<u128> for U128 {
        type Output = U128;
        fn sub(self, rhs: u128) -> U128 {
            U128::new(self.get().saturating_sub(rhs))
        }
    }

    // ========================================================================
    // Errors
    // ========================================================================

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum LedgerError {
        /// Zero or otherwise malformed amount
        InvalidAmount,
        /// Tier index out of range
        InvalidTier,
        /// Tier has not been initialized
        TierDisabled,
        /// Tier is already initialized
        TierExists,
        /// Deposit below the tier's minimum stake
        BelowMinStake,
        /// Owner already has an alive position
        PositionExists,
        /// No position at this index
        PositionNotFound,
        /// Position exists but has been eliminated
        PositionDead,
        /// Position is still alive (reap requires a dead record)
        PositionAlive,
        /// Tier is at its configured position capacity
        TierFull,
        /// No free slots left in the slab
        SlabFull,
        /// Inside the pre-scan lock window or a scan is in flight
        Locked,
        /// System is paused
        Paused,
        /// Operation requires the paused safety state
        NotPaused,
        /// Tier's next scan time has not been reached
        ScanNotDue,
        /// Tier already has a non-finalized scan
        ScanAlreadyActive,
        /// No commit/verify scan in progress for this tier
        NoActiveScan,
        /// Entropy slot not yet reached (or not yet captured)
        EntropyNotReady,
        /// Submission window has closed
        SubmissionClosed,
        /// Submission window is still open
        SubmissionOpen,
        /// Submitted elimination fails the deterministic draw
        DrawMismatch,
        /// Boost grant expired
        GrantExpired,
        /// Grant nonce at or below the consumed watermark
        NonceReused,
        /// Configuration value outside its valid range
        InvalidParams,
        /// Epoch reset deadline not yet passed
        ResetNotReady,
        /// Arithmetic overflow
        Overflow,
        /// Requested more than the accrued protocol revenue
        InsufficientRevenue,
    }

    pub type Result<T> = core::result::Result<T, LedgerError>;

    // ========================================================================
    // Deterministic draw
    // ========================================================================

    pub mod draw {
        use super::BPS_DENOM;
        use arrayref::array_ref;
        use solana_program::keccak;

        /// Roll in [0, 10_000) for a participant under the captured entropy.
        /// Reproducible off-chain with any keccak-256 implementation.
        pub fn roll(entropy: &[u8; 32], participant_id: u64) -> u16 {
            let h = keccak::hashv(&[entropy, &participant_id.to_le_bytes()]);
            let word = u64::from_le_bytes(*array_ref![h.0, 0, 8]);
            (word % BPS_DENOM) as u16
        }

        /// Pure elimination predicate. `rate_bps == 0` never eliminates,
        /// `rate_bps == 10_000` always does.
        pub fn is_eliminated(entropy: &[u8; 32], participant_id: u64, rate_bps: u16) -> bool {
            if rate_bps == 0 {
                return false;
            }
            roll(entropy, participant_id) < rate_bps
        }
    }

    /// Hook for tier-specific extra risk (e.g. a bottom-percentile penalty).
    /// The engine computes base rate and boost cut, then hands the result to
    /// the modifier. The returned rate is clamped to 10_000.
    pub trait RiskModifier {
        fn effective_rate_bps(&self, tier: &TierState, position: &Position, rate_bps: u16) -> u16;
    }

    /// Identity modifier: the effective rate is base rate after boost cut.
    pub struct NoOpModifier;

    impl RiskModifier for NoOpModifier {
        fn effective_rate_bps(&self, _t: &TierState, _p: &Position, rate_bps: u16) -> u16 {
            rate_bps
        }
    }

    // ========================================================================
    // Slab records
    // ========================================================================

    /// One staked participant. `position_id` is monotonic and never recycled;
    /// it is the participant id fed to the draw.
    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Position {
        pub position_id: u64,
        pub deposited_at_slot: u64,
        pub boost_expires_at_slot: u64,
        /// Staked principal. Retained as a historical record after elimination.
        pub amount: U128,
        /// Tier reward accumulator value at last interaction (lazy accrual).
        pub reward_acc_snapshot: U128,
        /// Settled, not-yet-paid reward.
        pub reward_claimable: U128,
        pub owner: [u8; 32],
        /// Consecutive scans survived.
        pub streak: u32,
        pub boost_rate_cut_bps: u16,
        pub tier: u8,
        pub alive: u8,
    }

    fn empty_position() -> Position {
        Position {
            position_id: 0,
            deposited_at_slot: 0,
            boost_expires_at_slot: 0,
            amount: U128::ZERO,
            reward_acc_snapshot: U128::ZERO,
            reward_claimable: U128::ZERO,
            owner: [0; 32],
            streak: 0,
            boost_rate_cut_bps: 0,
            tier: 0,
            alive: 0,
        }
    }

    /// Per-tier configuration. Validated at write time: rates within
    /// 10_000 bps, non-zero timing windows, lock window inside the interval.
    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TierParams {
        pub scan_interval_slots: u64,
        pub lock_duration_slots: u64,
        pub reveal_delay_slots: u64,
        pub submission_window_slots: u64,
        pub min_stake: u64,
        pub base_elimination_rate_bps: u16,
        pub max_positions: u16,
        pub burn_share_bps: u16,
        pub survivor_share_bps: u16,
    }

    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TierState {
        pub params: TierParams,
        /// Sum of `amount` over alive positions in this tier.
        pub total_staked: U128,
        /// Reward per stake unit, ACC_SCALE fixed point, monotonic.
        pub reward_acc: U128,
        pub next_scan_at: u64,
        pub alive_count: u16,
        pub enabled: u8,
        pub _padding: [u8; 5],
    }

    fn empty_tier() -> TierState {
        TierState {
            params: TierParams {
                scan_interval_slots: 0,
                lock_duration_slots: 0,
                reveal_delay_slots: 0,
                submission_window_slots: 0,
                min_stake: 0,
                base_elimination_rate_bps: 0,
                max_positions: 0,
                burn_share_bps: 0,
                survivor_share_bps: 0,
            },
            total_staked: U128::ZERO,
            reward_acc: U128::ZERO,
            next_scan_at: 0,
            alive_count: 0,
            enabled: 0,
            _padding: [0; 5],
        }
    }

    /// One scan round. The record is reused per tier: a new commit overwrites
    /// a FINALIZED record; at most one non-finalized scan exists per tier.
    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Scan {
        pub scan_id: u64,
        pub entropy_slot: u64,
        pub opened_at_slot: u64,
        pub submission_deadline_slot: u64,
        pub total_value_eliminated: U128,
        pub entropy: [u8; 32],
        pub eliminated_count: u16,
        pub tier: u8,
        pub phase: u8,
        pub _padding: [u8; 4],
    }

    fn empty_scan() -> Scan {
        Scan {
            scan_id: 0,
            entropy_slot: 0,
            opened_at_slot: 0,
            submission_deadline_slot: 0,
            total_value_eliminated: U128::ZERO,
            entropy: [0; 32],
            eliminated_count: 0,
            tier: 0,
            phase: SCAN_NONE,
            _padding: [0; 4],
        }
    }

    /// Global engine parameters (epoch clock + tier count).
    #[repr(C)]
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EngineParams {
        pub epoch_duration_slots: u64,
        pub extend_window_slots: u64,
        pub extend_by_slots: u64,
        pub num_tiers: u8,
        pub _padding: [u8; 7],
    }

    /// Cascade legs of one finalized scan. The identity
    /// `burned + same_tier + upstream + revenue == total` holds exactly.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CascadeOutcome {
        pub scan_id: u64,
        pub total: u128,
        pub burned: u128,
        pub same_tier: u128,
        pub upstream: u128,
        pub revenue: u128,
        pub survivors: u16,
        pub eliminated: u16,
    }

    // ========================================================================
    // Engine
    // ========================================================================

    /// Fixed-slab ledger + scan state machine. Lives zero-copy inside the
    /// single program account; every method either fully applies or returns
    /// an error with no state change.
    #[repr(C)]
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct GauntletEngine {
        pub params: EngineParams,

        /// Collateral units custodied in the vault ATA.
        pub vault: U128,
        /// Accrued, uncollected protocol revenue (backed by the vault).
        pub protocol_revenue: U128,
        /// Lifetime burned value (reporting only; already left the vault).
        pub burned_total: U128,
        /// O(1) aggregate of settled `reward_claimable` across the slab.
        pub claimable_total: U128,

        pub epoch: u64,
        pub epoch_reset_deadline: u64,

        /// Monotonic ids, never recycled.
        pub next_position_id: u64,
        pub next_scan_id: u64,

        /// Boost-grant nonce watermark: a grant is accepted only with
        /// `nonce > grant_nonce_high`, giving global exactly-once use.
        pub grant_nonce_high: u64,

        // Lifetime counters (telemetry + conservation slack bound)
        pub lifetime_acc_bumps: u64,
        pub lifetime_eliminations: u64,

        pub num_used: u16,
        pub free_head: u16,
        pub paused: u8,
        pub _padding: [u8; 3],

        pub tiers: [TierState; MAX_TIERS],
        pub scans: [Scan; MAX_TIERS],

        /// Occupancy bitmap.
        pub used: [u64; BITMAP_WORDS],
        /// Freelist next pointers (u16::MAX = none).
        pub next_free: [u16; MAX_POSITIONS],
        pub positions: [Position; MAX_POSITIONS],
    }

    impl GauntletEngine {
        pub fn new(params: EngineParams, now_slot: u64) -> Self {
            let mut next_free = [u16::MAX; MAX_POSITIONS];
            let mut i = 0;
            while i + 1 < MAX_POSITIONS {
                next_free[i] = (i + 1) as u16;
                i += 1;
            }
            Self {
                params,
                vault: U128::ZERO,
                protocol_revenue: U128::ZERO,
                burned_total: U128::ZERO,
                claimable_total: U128::ZERO,
                epoch: 0,
                epoch_reset_deadline: now_slot.saturating_add(params.epoch_duration_slots),
                next_position_id: 1,
                next_scan_id: 1,
                grant_nonce_high: 0,
                lifetime_acc_bumps: 0,
                lifetime_eliminations: 0,
                num_used: 0,
                free_head: 0,
                paused: 0,
                _padding: [0; 3],
                tiers: [empty_tier(); MAX_TIERS],
                scans: [empty_scan(); MAX_TIERS],
                used: [0; BITMAP_WORDS],
                next_free,
                positions: [empty_position(); MAX_POSITIONS],
            }
        }

        pub fn validate_engine_params(params: &EngineParams) -> Result<()> {
            if params.num_tiers == 0 || params.num_tiers as usize > MAX_TIERS {
                return Err(LedgerError::InvalidParams);
            }
            if params.epoch_duration_slots == 0 {
                return Err(LedgerError::InvalidParams);
            }
            if params.extend_window_slots > params.epoch_duration_slots {
                return Err(LedgerError::InvalidParams);
            }
            Ok(())
        }

        pub fn validate_tier_params(p: &TierParams) -> Result<()> {
            if p.base_elimination_rate_bps as u64 > BPS_DENOM {
                return Err(LedgerError::InvalidParams);
            }
            if p.burn_share_bps as u64 > BPS_DENOM
                || p.survivor_share_bps as u64 > BPS_DENOM
                || p.burn_share_bps as u64 + p.survivor_share_bps as u64 > BPS_DENOM
            {
                return Err(LedgerError::InvalidParams);
            }
            if p.scan_interval_slots == 0
                || p.reveal_delay_slots == 0
                || p.submission_window_slots == 0
            {
                return Err(LedgerError::InvalidParams);
            }
            if p.lock_duration_slots >= p.scan_interval_slots {
                return Err(LedgerError::InvalidParams);
            }
            if p.max_positions == 0 || p.max_positions as usize > MAX_POSITIONS {
                return Err(LedgerError::InvalidParams);
            }
            Ok(())
        }

        // ========================================
        // Slab management
        // ========================================

        #[inline]
        pub fn is_used(&self, idx: usize) -> bool {
            if idx >= MAX_POSITIONS {
                return false;
            }
            self.used[idx / 64] & (1u64 << (idx % 64)) != 0
        }

        #[inline]
        fn set_used(&mut self, idx: usize) {
            self.used[idx / 64] |= 1u64 << (idx % 64);
        }

        #[inline]
        fn clear_used(&mut self, idx: usize) {
            self.used[idx / 64] &= !(1u64 << (idx % 64));
        }

        fn alloc_slot(&mut self) -> Result<u16> {
            if self.free_head == u16::MAX {
                return Err(LedgerError::SlabFull);
            }
            let idx = self.free_head;
            self.free_head = self.next_free[idx as usize];
            self.set_used(idx as usize);
            self.num_used = self.num_used.saturating_add(1);
            Ok(idx)
        }

        fn free_slot(&mut self, idx: u16) {
            self.positions[idx as usize] = empty_position();
            self.clear_used(idx as usize);
            self.next_free[idx as usize] = self.free_head;
            self.free_head = idx;
            self.num_used = self.num_used.saturating_sub(1);
        }

        pub fn for_each_used<F: FnMut(usize, &Position)>(&self, mut f: F) {
            for i in 0..MAX_POSITIONS {
                if self.is_used(i) {
                    f(i, &self.positions[i]);
                }
            }
        }

        pub fn find_alive_by_owner(&self, owner: &[u8; 32]) -> Option<u16> {
            for i in 0..MAX_POSITIONS {
                if self.is_used(i) && self.positions[i].alive == 1 && self.positions[i].owner == *owner {
                    return Some(i as u16);
                }
            }
            None
        }

        fn tier_index(&self, tier: u8) -> Result<usize> {
            if tier >= self.params.num_tiers {
                return Err(LedgerError::InvalidTier);
            }
            Ok(tier as usize)
        }

        fn enabled_tier(&self, tier: u8) -> Result<usize> {
            let t = self.tier_index(tier)?;
            if self.tiers[t].enabled == 0 {
                return Err(LedgerError::TierDisabled);
            }
            Ok(t)
        }

        fn require_position(&self, idx: u16) -> Result<()> {
            if !self.is_used(idx as usize) {
                return Err(LedgerError::PositionNotFound);
            }
            Ok(())
        }

        fn require_alive(&self, idx: u16) -> Result<()> {
            self.require_position(idx)?;
            if self.positions[idx as usize].alive == 0 {
                return Err(LedgerError::PositionDead);
            }
            Ok(())
        }

        fn require_running(&self) -> Result<()> {
            if self.paused != 0 {
                return Err(LedgerError::Paused);
            }
            Ok(())
        }

        // ========================================
        // Tier administration
        // ========================================

        pub fn init_tier(&mut self, tier: u8, params: TierParams, now_slot: u64) -> Result<()> {
            let t = self.tier_index(tier)?;
            if self.tiers[t].enabled != 0 {
                return Err(LedgerError::TierExists);
            }
            Self::validate_tier_params(&params)?;
            self.tiers[t] = TierState {
                params,
                total_staked: U128::ZERO,
                reward_acc: U128::ZERO,
                next_scan_at: now_slot.saturating_add(params.scan_interval_slots),
                alive_count: 0,
                enabled: 1,
                _padding: [0; 5],
            };
            Ok(())
        }

        pub fn update_tier_params(&mut self, tier: u8, params: TierParams) -> Result<()> {
            let t = self.enabled_tier(tier)?;
            Self::validate_tier_params(&params)?;
            self.tiers[t].params = params;
            Ok(())
        }

        // ========================================
        // Reward accrual
        // ========================================

        /// Settle pending accrual into the claimable balance and refresh the
        /// snapshot. Must run inside every state-changing touch of a position.
        fn settle_rewards(&mut self, idx: u16) -> Result<u128> {
            let i = idx as usize;
            let t = self.positions[i].tier as usize;
            let acc = self.tiers[t].reward_acc.get();
            let snap = self.positions[i].reward_acc_snapshot.get();
            let amount = self.positions[i].amount.get();
            let delta = acc.checked_sub(snap).ok_or(LedgerError::Overflow)?;
            let pending = delta
                .checked_mul(amount)
                .ok_or(LedgerError::Overflow)?
                / ACC_SCALE;
            if pending > 0 {
                self.positions[i].reward_claimable = self.positions[i].reward_claimable + pending;
                self.claimable_total = self.claimable_total + pending;
            }
            self.positions[i].reward_acc_snapshot = U128::new(acc);
            Ok(pending)
        }

        /// Distribute `amount` across a tier's alive stake by bumping the
        /// accumulator. Fixed-point dust goes to protocol revenue. Returns the
        /// exactly-distributed amount. O(1) regardless of participant count.
        fn bump_reward_acc(&mut self, t: usize, amount: u128) -> Result<u128> {
            let total = self.tiers[t].total_staked.get();
            if total == 0 {
                return Err(LedgerError::InvalidParams);
            }
            let delta = amount
                .checked_mul(ACC_SCALE)
                .ok_or(LedgerError::Overflow)?
                / total;
            let distributed = delta
                .checked_mul(total)
                .ok_or(LedgerError::Overflow)?
                / ACC_SCALE;
            let dust = amount - distributed;
            self.tiers[t].reward_acc = self.tiers[t].reward_acc + delta;
            self.protocol_revenue = self.protocol_revenue + dust;
            self.lifetime_acc_bumps = self.lifetime_acc_bumps.saturating_add(1);
            Ok(distributed)
        }

        // ========================================
        // Ledger operations
        // ========================================

        pub fn deposit(
            &mut self,
            owner: [u8; 32],
            tier: u8,
            amount: u128,
            now_slot: u64,
        ) -> Result<u16> {
            self.require_running()?;
            if amount == 0 {
                return Err(LedgerError::InvalidAmount);
            }
            let t = self.enabled_tier(tier)?;
            if amount < self.tiers[t].params.min_stake as u128 {
                return Err(LedgerError::BelowMinStake);
            }
            if self.find_alive_by_owner(&owner).is_some() {
                return Err(LedgerError::PositionExists);
            }
            if self.tiers[t].alive_count >= self.tiers[t].params.max_positions {
                return Err(LedgerError::TierFull);
            }

            let idx = self.alloc_slot()?;
            let position_id = self.next_position_id;
            self.next_position_id = self.next_position_id.saturating_add(1);

            self.positions[idx as usize] = Position {
                position_id,
                deposited_at_slot: now_slot,
                boost_expires_at_slot: 0,
                amount: U128::new(amount),
                reward_acc_snapshot: self.tiers[t].reward_acc,
                reward_claimable: U128::ZERO,
                owner,
                streak: 0,
                boost_rate_cut_bps: 0,
                tier,
                alive: 1,
            };

            self.tiers[t].total_staked = self.tiers[t].total_staked + amount;
            self.tiers[t].alive_count = self.tiers[t].alive_count.saturating_add(1);
            self.vault = self.vault + amount;

            self.maybe_extend_epoch(now_slot);
            Ok(idx)
        }

        pub fn top_up(&mut self, idx: u16, amount: u128, now_slot: u64) -> Result<()> {
            self.require_running()?;
            if amount == 0 {
                return Err(LedgerError::InvalidAmount);
            }
            self.require_alive(idx)?;
            self.settle_rewards(idx)?;
            let t = self.positions[idx as usize].tier as usize;
            self.positions[idx as usize].amount = self.positions[idx as usize].amount + amount;
            self.tiers[t].total_staked = self.tiers[t].total_staked + amount;
            self.vault = self.vault + amount;
            self.maybe_extend_epoch(now_slot);
            Ok(())
        }

        /// Full withdrawal: principal + settled reward, position destroyed.
        pub fn withdraw(&mut self, idx: u16, now_slot: u64) -> Result<u128> {
            self.require_running()?;
            self.require_alive(idx)?;
            let t = self.positions[idx as usize].tier as usize;

            let next_scan = self.tiers[t].next_scan_at;
            let lock_start = next_scan.saturating_sub(self.tiers[t].params.lock_duration_slots);
            if now_slot >= lock_start && now_slot < next_scan {
                return Err(LedgerError::Locked);
            }
            // No exits while a scan is in flight: entropy may already be known.
            let phase = self.scans[t].phase;
            if phase == SCAN_COMMITTED || phase == SCAN_VERIFYING {
                return Err(LedgerError::Locked);
            }

            self.settle_rewards(idx)?;
            let amount = self.positions[idx as usize].amount.get();
            let claimable = self.positions[idx as usize].reward_claimable.get();
            let payout = amount.checked_add(claimable).ok_or(LedgerError::Overflow)?;

            self.claimable_total = self.claimable_total - claimable;
            self.tiers[t].total_staked = self.tiers[t].total_staked - amount;
            self.tiers[t].alive_count = self.tiers[t].alive_count.saturating_sub(1);
            self.vault = self.vault - payout;
            self.free_slot(idx);
            Ok(payout)
        }

        /// Pay out accrued reward only; the position persists.
        pub fn claim_reward(&mut self, idx: u16) -> Result<u128> {
            self.require_running()?;
            self.require_alive(idx)?;
            self.settle_rewards(idx)?;
            let claimable = self.positions[idx as usize].reward_claimable.get();
            if claimable > 0 {
                self.positions[idx as usize].reward_claimable = U128::ZERO;
                self.claimable_total = self.claimable_total - claimable;
                self.vault = self.vault - claimable;
            }
            Ok(claimable)
        }

        /// Attach a verified, time-boxed rate-cut grant. Signature checks are
        /// the wrapper's job; the engine enforces kind, expiry, magnitude and
        /// the global nonce watermark.
        pub fn apply_boost(
            &mut self,
            idx: u16,
            kind: u8,
            magnitude_bps: u16,
            expiry_slot: u64,
            nonce: u64,
            now_slot: u64,
        ) -> Result<()> {
            self.require_running()?;
            self.require_alive(idx)?;
            if kind != BOOST_KIND_RATE_CUT {
                return Err(LedgerError::InvalidParams);
            }
            if magnitude_bps as u64 > BPS_DENOM {
                return Err(LedgerError::InvalidParams);
            }
            if expiry_slot <= now_slot {
                return Err(LedgerError::GrantExpired);
            }
            if nonce <= self.grant_nonce_high {
                return Err(LedgerError::NonceReused);
            }
            self.grant_nonce_high = nonce;
            self.positions[idx as usize].boost_rate_cut_bps = magnitude_bps;
            self.positions[idx as usize].boost_expires_at_slot = expiry_slot;
            Ok(())
        }

        /// Principal-only exit, usable only while paused. Settled and pending
        /// rewards are folded into protocol revenue so the books stay exact.
        pub fn emergency_withdraw(&mut self, idx: u16) -> Result<u128> {
            if self.paused == 0 {
                return Err(LedgerError::NotPaused);
            }
            self.require_alive(idx)?;
            self.settle_rewards(idx)?;
            let t = self.positions[idx as usize].tier as usize;
            let principal = self.positions[idx as usize].amount.get();
            let claimable = self.positions[idx as usize].reward_claimable.get();

            self.claimable_total = self.claimable_total - claimable;
            self.protocol_revenue = self.protocol_revenue + claimable;
            self.tiers[t].total_staked = self.tiers[t].total_staked - principal;
            self.tiers[t].alive_count = self.tiers[t].alive_count.saturating_sub(1);
            self.vault = self.vault - principal;
            self.free_slot(idx);
            Ok(principal)
        }

        /// Free a dead record. Permissionless slab hygiene; the historical
        /// amount is only readable until the slot is reused.
        pub fn reap(&mut self, idx: u16) -> Result<()> {
            self.require_position(idx)?;
            if self.positions[idx as usize].alive != 0 {
                return Err(LedgerError::PositionAlive);
            }
            self.free_slot(idx);
            Ok(())
        }

        /// Fold an externally-pushed reward credit into a tier's accumulator.
        /// Returns false (and takes nothing) when the tier has no stake, so
        /// the credit is neither lost nor trapped.
        pub fn credit_emission(&mut self, tier: u8, amount: u128) -> Result<bool> {
            self.require_running()?;
            if amount == 0 {
                return Err(LedgerError::InvalidAmount);
            }
            let t = self.enabled_tier(tier)?;
            if self.tiers[t].total_staked.is_zero() {
                return Ok(false);
            }
            self.vault = self.vault + amount;
            self.bump_reward_acc(t, amount)?;
            Ok(true)
        }

        // ========================================
        // Scan lifecycle
        // ========================================

        /// Open a scan: commit to a future entropy slot. Permissionless;
        /// racing callers lose with ScanAlreadyActive.
        pub fn commit_scan(&mut self, tier: u8, now_slot: u64) -> Result<u64> {
            self.require_running()?;
            let t = self.enabled_tier(tier)?;
            let phase = self.scans[t].phase;
            if phase == SCAN_COMMITTED || phase == SCAN_VERIFYING {
                return Err(LedgerError::ScanAlreadyActive);
            }
            if now_slot < self.tiers[t].next_scan_at {
                return Err(LedgerError::ScanNotDue);
            }
            let scan_id = self.next_scan_id;
            self.next_scan_id = self.next_scan_id.saturating_add(1);
            self.scans[t] = Scan {
                scan_id,
                entropy_slot: now_slot.saturating_add(self.tiers[t].params.reveal_delay_slots),
                opened_at_slot: now_slot,
                submission_deadline_slot: 0,
                total_value_eliminated: U128::ZERO,
                entropy: [0; 32],
                eliminated_count: 0,
                tier,
                phase: SCAN_COMMITTED,
                _padding: [0; 4],
            };
            Ok(scan_id)
        }

        /// Capture resolved entropy and open the submission window.
        pub fn capture_entropy(&mut self, tier: u8, entropy: [u8; 32], now_slot: u64) -> Result<()> {
            self.require_running()?;
            let t = self.enabled_tier(tier)?;
            match self.scans[t].phase {
                SCAN_COMMITTED => {}
                SCAN_VERIFYING => return Err(LedgerError::ScanAlreadyActive),
                _ => return Err(LedgerError::NoActiveScan),
            }
            if now_slot <= self.scans[t].entropy_slot {
                return Err(LedgerError::EntropyNotReady);
            }
            self.scans[t].entropy = entropy;
            self.scans[t].phase = SCAN_VERIFYING;
            self.scans[t].submission_deadline_slot =
                now_slot.saturating_add(self.tiers[t].params.submission_window_slots);
            Ok(())
        }

        /// Verify one elimination against the draw and apply it. Already-dead
        /// positions are skipped silently (Ok(false)) so duplicate submissions
        /// are harmless; fabricated eliminations fail with DrawMismatch.
        pub fn submit_elimination<M: RiskModifier>(
            &mut self,
            tier: u8,
            idx: u16,
            modifier: &M,
            now_slot: u64,
        ) -> Result<bool> {
            self.require_running()?;
            let t = self.enabled_tier(tier)?;
            match self.scans[t].phase {
                SCAN_VERIFYING => {}
                SCAN_COMMITTED => return Err(LedgerError::EntropyNotReady),
                _ => return Err(LedgerError::NoActiveScan),
            }
            if now_slot > self.scans[t].submission_deadline_slot {
                return Err(LedgerError::SubmissionClosed);
            }
            self.require_position(idx)?;
            let i = idx as usize;
            if self.positions[i].tier != tier {
                return Err(LedgerError::InvalidTier);
            }
            if self.positions[i].alive == 0 {
                return Ok(false);
            }

            let mut rate = self.tiers[t].params.base_elimination_rate_bps as u64;
            if now_slot < self.positions[i].boost_expires_at_slot {
                let cut = self.positions[i].boost_rate_cut_bps as u64;
                rate = rate * (BPS_DENOM - cut) / BPS_DENOM;
            }
            let rate = modifier
                .effective_rate_bps(&self.tiers[t], &self.positions[i], rate as u16)
                .min(BPS_DENOM as u16);

            if !draw::is_eliminated(&self.scans[t].entropy, self.positions[i].position_id, rate) {
                return Err(LedgerError::DrawMismatch);
            }

            // Settled-but-unclaimed reward rides along with the principal.
            self.settle_rewards(idx)?;
            let amount = self.positions[i].amount.get();
            let claimable = self.positions[i].reward_claimable.get();
            let value = amount.checked_add(claimable).ok_or(LedgerError::Overflow)?;

            self.positions[i].alive = 0;
            self.positions[i].reward_claimable = U128::ZERO;
            self.claimable_total = self.claimable_total - claimable;
            self.tiers[t].total_staked = self.tiers[t].total_staked - amount;
            self.tiers[t].alive_count = self.tiers[t].alive_count.saturating_sub(1);

            self.scans[t].total_value_eliminated = self.scans[t].total_value_eliminated + value;
            self.scans[t].eliminated_count = self.scans[t].eliminated_count.saturating_add(1);
            self.lifetime_eliminations = self.lifetime_eliminations.saturating_add(1);
            Ok(true)
        }

        /// Close the round: cascade the eliminated value, bump survivor
        /// streaks, advance the tier clock. A COMMITTED scan whose entropy
        /// fell out of SlotHashes finalizes with zero eliminations.
        pub fn finalize_scan(&mut self, tier: u8, now_slot: u64) -> Result<CascadeOutcome> {
            self.require_running()?;
            let t = self.enabled_tier(tier)?;
            match self.scans[t].phase {
                SCAN_VERIFYING => {
                    if now_slot <= self.scans[t].submission_deadline_slot {
                        return Err(LedgerError::SubmissionOpen);
                    }
                }
                SCAN_COMMITTED => {
                    let unreachable_at = self.scans[t]
                        .entropy_slot
                        .saturating_add(ENTROPY_TTL_SLOTS);
                    if now_slot <= unreachable_at {
                        return Err(LedgerError::EntropyNotReady);
                    }
                }
                _ => return Err(LedgerError::NoActiveScan),
            }

            let total = self.scans[t].total_value_eliminated.get();
            let scan_id = self.scans[t].scan_id;
            let burn_bps = self.tiers[t].params.burn_share_bps as u128;
            let survivor_bps = self.tiers[t].params.survivor_share_bps as u128;

            let burned = total * burn_bps / BPS_DENOM as u128;
            let survivor_share = total * survivor_bps / BPS_DENOM as u128;

            let mut same_tier = 0u128;
            let mut upstream = 0u128;
            let mut undistributed = 0u128;
            if survivor_share > 0 {
                if self.tiers[t].alive_count > 0 {
                    same_tier = self.bump_reward_acc(t, survivor_share)?;
                } else {
                    // Walk toward the safest tier; route to the nearest one
                    // with alive stake, else the share falls to revenue.
                    let mut d = t;
                    let mut routed = false;
                    while d > 0 {
                        d -= 1;
                        if self.tiers[d].enabled != 0 && self.tiers[d].alive_count > 0 {
                            upstream = self.bump_reward_acc(d, survivor_share)?;
                            routed = true;
                            break;
                        }
                    }
                    if !routed {
                        undistributed = survivor_share;
                    }
                }
            }

            // Everything not burned or distributed lands in revenue;
            // accumulator dust was already routed there by bump_reward_acc.
            let revenue = total - burned - same_tier - upstream;
            self.protocol_revenue =
                self.protocol_revenue + (total - burned - survivor_share) + undistributed;

            self.vault = self.vault - burned;
            self.burned_total = self.burned_total + burned;

            let mut survivors = 0u16;
            for i in 0..MAX_POSITIONS {
                if self.is_used(i)
                    && self.positions[i].alive == 1
                    && self.positions[i].tier == tier
                {
                    self.positions[i].streak = self.positions[i].streak.saturating_add(1);
                    survivors = survivors.saturating_add(1);
                }
            }

            self.tiers[t].next_scan_at = self.tiers[t]
                .next_scan_at
                .saturating_add(self.tiers[t].params.scan_interval_slots);
            let eliminated = self.scans[t].eliminated_count;
            self.scans[t].phase = SCAN_FINALIZED;

            Ok(CascadeOutcome {
                scan_id,
                total,
                burned,
                same_tier,
                upstream,
                revenue,
                survivors,
                eliminated,
            })
        }

        // ========================================
        // Epoch clock
        // ========================================

        /// Deposits near the reset deadline push it out, so nobody can park a
        /// deposit at the last moment and immediately trigger the reset.
        fn maybe_extend_epoch(&mut self, now_slot: u64) {
            let deadline = self.epoch_reset_deadline;
            if now_slot < deadline && deadline - now_slot <= self.params.extend_window_slots {
                self.epoch_reset_deadline = deadline.saturating_add(self.params.extend_by_slots);
            }
        }

        pub fn advance_epoch(&mut self, now_slot: u64) -> Result<u64> {
            if now_slot < self.epoch_reset_deadline {
                return Err(LedgerError::ResetNotReady);
            }
            self.epoch = self.epoch.saturating_add(1);
            self.epoch_reset_deadline = now_slot.saturating_add(self.params.epoch_duration_slots);
            Ok(self.epoch)
        }

        // ========================================
        // Safety controls
        // ========================================

        pub fn pause(&mut self) -> Result<()> {
            if self.paused != 0 {
                return Err(LedgerError::Paused);
            }
            self.paused = 1;
            Ok(())
        }

        pub fn unpause(&mut self) -> Result<()> {
            if self.paused == 0 {
                return Err(LedgerError::NotPaused);
            }
            self.paused = 0;
            Ok(())
        }

        pub fn collect_revenue(&mut self, amount: u128) -> Result<()> {
            if amount == 0 {
                return Err(LedgerError::InvalidAmount);
            }
            if amount > self.protocol_revenue.get() {
                return Err(LedgerError::InsufficientRevenue);
            }
            self.protocol_revenue = self.protocol_revenue - amount;
            self.vault = self.vault - amount;
            Ok(())
        }

        // ========================================
        // Auditing
        // ========================================

        /// Conservation + ledger-consistency audit.
        ///
        /// vault == Σ alive amounts + Σ claimable + Σ pending accrual
        ///          + limbo value of non-finalized scans + protocol revenue,
        /// up to per-position floor slack bounded by accumulator bumps, and
        /// per-tier aggregates match the slab contents.
        pub fn check_conservation(&self) -> bool {
            let mut staked_by_tier = [0u128; MAX_TIERS];
            let mut alive_by_tier = [0u16; MAX_TIERS];
            let mut claimable = 0u128;
            let mut pending = 0u128;

            for i in 0..MAX_POSITIONS {
                if !self.is_used(i) {
                    continue;
                }
                let p = &self.positions[i];
                claimable = claimable.saturating_add(p.reward_claimable.get());
                if p.alive == 1 {
                    let t = p.tier as usize;
                    if t >= MAX_TIERS {
                        return false;
                    }
                    staked_by_tier[t] = staked_by_tier[t].saturating_add(p.amount.get());
                    alive_by_tier[t] = alive_by_tier[t].saturating_add(1);
                    let delta = self.tiers[t]
                        .reward_acc
                        .get()
                        .saturating_sub(p.reward_acc_snapshot.get());
                    pending = pending.saturating_add(
                        delta.saturating_mul(p.amount.get()) / ACC_SCALE,
                    );
                }
            }

            let mut staked = 0u128;
            for t in 0..MAX_TIERS {
                if self.tiers[t].total_staked.get() != staked_by_tier[t] {
                    return false;
                }
                if self.tiers[t].alive_count != alive_by_tier[t] {
                    return false;
                }
                staked = staked.saturating_add(staked_by_tier[t]);
            }

            if self.claimable_total.get() != claimable {
                return false;
            }

            let mut limbo = 0u128;
            for t in 0..MAX_TIERS {
                let phase = self.scans[t].phase;
                if phase == SCAN_COMMITTED || phase == SCAN_VERIFYING {
                    limbo = limbo.saturating_add(self.scans[t].total_value_eliminated.get());
                }
            }

            let liabilities = staked
                .saturating_add(claimable)
                .saturating_add(pending)
                .saturating_add(limbo)
                .saturating_add(self.protocol_revenue.get());

            let vault = self.vault.get();
            if vault < liabilities {
                return false;
            }
            let slack_bound =
                (self.lifetime_acc_bumps as u128).saturating_mul(MAX_POSITIONS as u128);
            vault - liabilities <= slack_bound
        }
    }
}

// 3. mod zc (Zero-Copy unsafe island)
pub mod zc {
    use crate::constants::{ENGINE_ALIGN, ENGINE_LEN, ENGINE_OFF};
    use crate::engine::GauntletEngine;
    use solana_program::program_error::ProgramError;

    #[inline]
    pub fn engine_ref<'a>(data: &'a [u8]) -> Result<&'a GauntletEngine, ProgramError> {
        if data.len() < ENGINE_OFF + ENGINE_LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        let ptr = unsafe { data.as_ptr().add(ENGINE_OFF) };
        if (ptr as usize) % ENGINE_ALIGN != 0 {
            return Err(ProgramError::InvalidAccountData);
        }
        Ok(unsafe { &*(ptr as *const GauntletEngine) })
    }

    #[inline]
    pub fn engine_mut<'a>(data: &'a mut [u8]) -> Result<&'a mut GauntletEngine, ProgramError> {
        if data.len() < ENGINE_OFF + ENGINE_LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        let ptr = unsafe { data.as_mut_ptr().add(ENGINE_OFF) };
        if (ptr as usize) % ENGINE_ALIGN != 0 {
            return Err(ProgramError::InvalidAccountData);
        }
        Ok(unsafe { &mut *(ptr as *mut GauntletEngine) })
    }

    #[inline]
    pub fn engine_write(data: &mut [u8], engine: GauntletEngine) -> Result<(), ProgramError> {
        if data.len() < ENGINE_OFF + ENGINE_LEN {
            return Err(ProgramError::InvalidAccountData);
        }
        let ptr = unsafe { data.as_mut_ptr().add(ENGINE_OFF) };
        if (ptr as usize) % ENGINE_ALIGN != 0 {
            return Err(ProgramError::InvalidAccountData);
        }
        unsafe { core::ptr::write(ptr as *mut GauntletEngine, engine) };
        Ok(())
    }
}

// 4. mod error
pub mod error {
    use crate::engine::LedgerError;
    use num_derive::FromPrimitive;
    use solana_program::program_error::ProgramError;
    use thiserror::Error;

    #[derive(Clone, Copy, Debug, Eq, PartialEq, Error, FromPrimitive)]
    pub enum GauntletError {
        #[error("invalid slab magic")]
        InvalidMagic,
        #[error("slab version mismatch")]
        InvalidVersion,
        #[error("slab already initialized")]
        AlreadyInitialized,
        #[error("slab not initialized")]
        NotInitialized,
        #[error("slab account has wrong length")]
        InvalidSlabLen,
        #[error("vault is not the expected token account")]
        InvalidVaultAta,
        #[error("token account has wrong mint")]
        InvalidMint,
        #[error("expected account to be a signer")]
        ExpectedSigner,
        #[error("expected account to be writable")]
        ExpectedWritable,
        #[error("account is not the expected sysvar")]
        InvalidSysvar,
        #[error("signer is not the admin")]
        AdminOnly,
        #[error("signer is not the registered keeper")]
        KeeperOnly,
        #[error("signer is not the emission authority")]
        EmissionAuthorityOnly,
        #[error("position is not owned by the signer")]
        OwnerMismatch,
        #[error("entropy slot no longer present in SlotHashes")]
        EntropyUnavailable,
        #[error("no ed25519 verification instruction precedes this call")]
        GrantSignatureMissing,
        #[error("ed25519 instruction data is malformed")]
        GrantSignatureMalformed,
        #[error("grant was not signed by the registered authorizer")]
        GrantSignerMismatch,
        #[error("signed message does not match the submitted grant")]
        GrantMessageMismatch,
        // Engine errors mapped:
        #[error("engine: invalid amount")]
        EngineInvalidAmount,
        #[error("engine: invalid tier")]
        EngineInvalidTier,
        #[error("engine: tier disabled")]
        EngineTierDisabled,
        #[error("engine: tier already initialized")]
        EngineTierExists,
        #[error("engine: below minimum stake")]
        EngineBelowMinStake,
        #[error("engine: position already exists")]
        EnginePositionExists,
        #[error("engine: position not found")]
        EnginePositionNotFound,
        #[error("engine: position eliminated")]
        EnginePositionDead,
        #[error("engine: position still alive")]
        EnginePositionAlive,
        #[error("engine: tier full")]
        EngineTierFull,
        #[error("engine: slab full")]
        EngineSlabFull,
        #[error("engine: locked for upcoming scan")]
        EngineLocked,
        #[error("engine: paused")]
        EnginePaused,
        #[error("engine: not paused")]
        EngineNotPaused,
        #[error("engine: scan not due")]
        EngineScanNotDue,
        #[error("engine: scan already active")]
        EngineScanAlreadyActive,
        #[error("engine: no active scan")]
        EngineNoActiveScan,
        #[error("engine: entropy not ready")]
        EngineEntropyNotReady,
        #[error("engine: submission window closed")]
        EngineSubmissionClosed,
        #[error("engine: submission window still open")]
        EngineSubmissionOpen,
        #[error("engine: draw mismatch")]
        EngineDrawMismatch,
        #[error("engine: grant expired")]
        EngineGrantExpired,
        #[error("engine: grant nonce reused")]
        EngineNonceReused,
        #[error("engine: invalid configuration")]
        EngineInvalidParams,
        #[error("engine: epoch reset not ready")]
        EngineResetNotReady,
        #[error("engine: arithmetic overflow")]
        EngineOverflow,
        #[error("engine: insufficient protocol revenue")]
        EngineInsufficientRevenue,
    }

    impl From<GauntletError> for ProgramError {
        fn from(e: GauntletError) -> Self {
            ProgramError::Custom(e as u32)
        }
    }

    pub fn map_ledger_error(e: LedgerError) -> ProgramError {
        let err = match e {
            LedgerError::InvalidAmount => GauntletError::EngineInvalidAmount,
            LedgerError::InvalidTier => GauntletError::EngineInvalidTier,
            LedgerError::TierDisabled => GauntletError::EngineTierDisabled,
            LedgerError::TierExists => GauntletError::EngineTierExists,
            LedgerError::BelowMinStake => GauntletError::EngineBelowMinStake,
            LedgerError::PositionExists => GauntletError::EnginePositionExists,
            LedgerError::PositionNotFound => GauntletError::EnginePositionNotFound,
            LedgerError::PositionDead => GauntletError::EnginePositionDead,
            LedgerError::PositionAlive => GauntletError::EnginePositionAlive,
            LedgerError::TierFull => GauntletError::EngineTierFull,
            LedgerError::SlabFull => GauntletError::EngineSlabFull,
            LedgerError::Locked => GauntletError::EngineLocked,
            LedgerError::Paused => GauntletError::EnginePaused,
            LedgerError::NotPaused => GauntletError::EngineNotPaused,
            LedgerError::ScanNotDue => GauntletError::EngineScanNotDue,
            LedgerError::ScanAlreadyActive => GauntletError::EngineScanAlreadyActive,
            LedgerError::NoActiveScan => GauntletError::EngineNoActiveScan,
            LedgerError::EntropyNotReady => GauntletError::EngineEntropyNotReady,
            LedgerError::SubmissionClosed => GauntletError::EngineSubmissionClosed,
            LedgerError::SubmissionOpen => GauntletError::EngineSubmissionOpen,
            LedgerError::DrawMismatch => GauntletError::EngineDrawMismatch,
            LedgerError::GrantExpired => GauntletError::EngineGrantExpired,
            LedgerError::NonceReused => GauntletError::EngineNonceReused,
            LedgerError::InvalidParams => GauntletError::EngineInvalidParams,
            LedgerError::ResetNotReady => GauntletError::EngineResetNotReady,
            LedgerError::Overflow => GauntletError::EngineOverflow,
            LedgerError::InsufficientRevenue => GauntletError::EngineInsufficientRevenue,
        };
        ProgramError::Custom(err as u32)
    }
}

// 5. mod ix
pub mod ix {
    use crate::engine::{EngineParams, TierParams};
    use solana_program::{program_error::ProgramError, pubkey::Pubkey};

    #[derive(Debug)]
    pub enum Instruction {
        InitGauntlet {
            authorizer: Pubkey,
            emission_authority: Pubkey,
            keeper: Pubkey,
            engine_params: EngineParams,
        },
        InitTier { tier: u8, params: TierParams },
        UpdateTierParams { tier: u8, params: TierParams },
        Deposit { tier: u8, amount: u64 },
        TopUp { pos_idx: u16, amount: u64 },
        Withdraw { pos_idx: u16 },
        ClaimReward { pos_idx: u16 },
        ApplyBoost {
            pos_idx: u16,
            kind: u8,
            magnitude_bps: u16,
            expiry_slot: u64,
            nonce: u64,
        },
        EmergencyWithdraw { pos_idx: u16 },
        CreditEmission { tier: u8, amount: u64 },
        CommitScan { tier: u8 },
        SubmitElimination { tier: u8, pos_idx: u16 },
        FinalizeScan { tier: u8 },
        AdvanceEpoch,
        Pause,
        Unpause,
        SetAuthorizer { new_key: Pubkey },
        CollectRevenue { amount: u64 },
        ReapPosition { pos_idx: u16 },
    }

    impl Instruction {
        pub fn decode(input: &[u8]) -> Result<Self, ProgramError> {
            let (&tag, mut rest) = input
                .split_first()
                .ok_or(ProgramError::InvalidInstructionData)?;

            match tag {
                0 => {
                    let authorizer = read_pubkey(&mut rest)?;
                    let emission_authority = read_pubkey(&mut rest)?;
                    let keeper = read_pubkey(&mut rest)?;
                    let engine_params = read_engine_params(&mut rest)?;
                    Ok(Instruction::InitGauntlet {
                        authorizer,
                        emission_authority,
                        keeper,
                        engine_params,
                    })
                }
                1 => {
                    let tier = read_u8(&mut rest)?;
                    let params = read_tier_params(&mut rest)?;
                    Ok(Instruction::InitTier { tier, params })
                }
                2 => {
                    let tier = read_u8(&mut rest)?;
                    let params = read_tier_params(&mut rest)?;
                    Ok(Instruction::UpdateTierParams { tier, params })
                }
                3 => {
                    let tier = read_u8(&mut rest)?;
                    let amount = read_u64(&mut rest)?;
                    Ok(Instruction::Deposit { tier, amount })
                }
                4 => {
                    let pos_idx = read_u16(&mut rest)?;
                    let amount = read_u64(&mut rest)?;
                    Ok(Instruction::TopUp { pos_idx, amount })
                }
                5 => {
                    let pos_idx = read_u16(&mut rest)?;
                    Ok(Instruction::Withdraw { pos_idx })
                }
                6 => {
                    let pos_idx = read_u16(&mut rest)?;
                    Ok(Instruction::ClaimReward { pos_idx })
                }
                7 => {
                    let pos_idx = read_u16(&mut rest)?;
                    let kind = read_u8(&mut rest)?;
                    let magnitude_bps = read_u16(&mut rest)?;
                    let expiry_slot = read_u64(&mut rest)?;
                    let nonce = read_u64(&mut rest)?;
                    Ok(Instruction::ApplyBoost {
                        pos_idx,
                        kind,
                        magnitude_bps,
                        expiry_slot,
                        nonce,
                    })
                }
                8 => {
                    let pos_idx = read_u16(&mut rest)?;
                    Ok(Instruction::EmergencyWithdraw { pos_idx })
                }
                9 => {
                    let tier = read_u8(&mut rest)?;
                    let amount = read_u64(&mut rest)?;
                    Ok(Instruction::CreditEmission { tier, amount })
                }
                10 => {
                    let tier = read_u8(&mut rest)?;
                    Ok(Instruction::CommitScan { tier })
                }
                11 => {
                    let tier = read_u8(&mut rest)?;
                    let pos_idx = read_u16(&mut rest)?;
                    Ok(Instruction::SubmitElimination { tier, pos_idx })
                }
                12 => {
                    let tier = read_u8(&mut rest)?;
                    Ok(Instruction::FinalizeScan { tier })
                }
                13 => Ok(Instruction::AdvanceEpoch),
                14 => Ok(Instruction::Pause),
                15 => Ok(Instruction::Unpause),
                16 => {
                    let new_key = read_pubkey(&mut rest)?;
                    Ok(Instruction::SetAuthorizer { new_key })
                }
                17 => {
                    let amount = read_u64(&mut rest)?;
                    Ok(Instruction::CollectRevenue { amount })
                }
                18 => {
                    let pos_idx = read_u16(&mut rest)?;
                    Ok(Instruction::ReapPosition { pos_idx })
                }
                _ => Err(ProgramError::InvalidInstructionData),
            }
        }
    }

    fn read_u8(input: &mut &[u8]) -> Result<u8, ProgramError> {
        let (&val, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        *input = rest;
        Ok(val)
    }

    fn read_u16(input: &mut &[u8]) -> Result<u16, ProgramError> {
        if input.len() < 2 {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(2);
        *input = rest;
        Ok(u16::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(input: &mut &[u8]) -> Result<u64, ProgramError> {
        if input.len() < 8 {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(8);
        *input = rest;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_pubkey(input: &mut &[u8]) -> Result<Pubkey, ProgramError> {
        if input.len() < 32 {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(32);
        *input = rest;
        Ok(Pubkey::new_from_array(bytes.try_into().unwrap()))
    }

    fn read_engine_params(input: &mut &[u8]) -> Result<EngineParams, ProgramError> {
        Ok(EngineParams {
            epoch_duration_slots: read_u64(input)?,
            extend_window_slots: read_u64(input)?,
            extend_by_slots: read_u64(input)?,
            num_tiers: read_u8(input)?,
            _padding: [0; 7],
        })
    }

    fn read_tier_params(input: &mut &[u8]) -> Result<TierParams, ProgramError> {
        Ok(TierParams {
            scan_interval_slots: read_u64(input)?,
            lock_duration_slots: read_u64(input)?,
            reveal_delay_slots: read_u64(input)?,
            submission_window_slots: read_u64(input)?,
            min_stake: read_u64(input)?,
            base_elimination_rate_bps: read_u16(input)?,
            max_positions: read_u16(input)?,
            burn_share_bps: read_u16(input)?,
            survivor_share_bps: read_u16(input)?,
        })
    }
}

// 6. mod accounts
pub mod accounts {
    use crate::error::GauntletError;
    use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

    pub fn expect_len(accounts: &[AccountInfo], n: usize) -> Result<(), ProgramError> {
        if accounts.len() < n {
            return Err(ProgramError::NotEnoughAccountKeys);
        }
        Ok(())
    }

    pub fn expect_signer(ai: &AccountInfo) -> Result<(), ProgramError> {
        if !ai.is_signer {
            return Err(GauntletError::ExpectedSigner.into());
        }
        Ok(())
    }

    pub fn expect_writable(ai: &AccountInfo) -> Result<(), ProgramError> {
        if !ai.is_writable {
            return Err(GauntletError::ExpectedWritable.into());
        }
        Ok(())
    }

    pub fn expect_owner(ai: &AccountInfo, owner: &Pubkey) -> Result<(), ProgramError> {
        if ai.owner != owner {
            return Err(ProgramError::IllegalOwner);
        }
        Ok(())
    }

    pub fn expect_key(ai: &AccountInfo, expected: &Pubkey) -> Result<(), ProgramError> {
        if ai.key != expected {
            return Err(ProgramError::InvalidArgument);
        }
        Ok(())
    }

    pub fn derive_vault_authority(program_id: &Pubkey, slab_key: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[b"vault", slab_key.as_ref()], program_id)
    }
}

// 7. mod state
pub mod state {
    use crate::constants::{CONFIG_LEN, HEADER_LEN};
    use bytemuck::{Pod, Zeroable};
    use core::cell::RefMut;
    use solana_program::account_info::AccountInfo;
    use solana_program::program_error::ProgramError;

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    pub struct SlabHeader {
        pub magic: u64,
        pub version: u32,
        pub bump: u8,
        pub _padding: [u8; 3],
        pub admin: [u8; 32],
        pub _reserved: [u8; 16],
    }

    #[repr(C)]
    #[derive(Clone, Copy, Pod, Zeroable)]
    pub struct GauntletConfig {
        pub collateral_mint: [u8; 32],
        pub vault_pubkey: [u8; 32],
        /// Trusted boost-grant signing key. Rotation invalidates unused
        /// grants signed by the previous key.
        pub authorizer: [u8; 32],
        pub emission_authority: [u8; 32],
        pub keeper: [u8; 32],
        pub vault_authority_bump: u8,
        pub _padding: [u8; 7],
    }

    pub fn slab_data_mut<'a, 'b>(
        ai: &'b AccountInfo<'a>,
    ) -> Result<RefMut<'b, &'a mut [u8]>, ProgramError> {
        Ok(ai.try_borrow_mut_data()?)
    }

    pub fn read_header(data: &[u8]) -> SlabHeader {
        let mut h = SlabHeader::zeroed();
        let src = &data[..HEADER_LEN];
        let dst = bytemuck::bytes_of_mut(&mut h);
        dst.copy_from_slice(&src[..core::mem::size_of::<SlabHeader>()]);
        h
    }

    pub fn write_header(data: &mut [u8], h: &SlabHeader) {
        let src = bytemuck::bytes_of(h);
        let dst = &mut data[..core::mem::size_of::<SlabHeader>()];
        dst.copy_from_slice(src);
    }

    pub fn read_config(data: &[u8]) -> GauntletConfig {
        let mut c = GauntletConfig::zeroed();
        let src = &data[HEADER_LEN..HEADER_LEN + CONFIG_LEN];
        let dst = bytemuck::bytes_of_mut(&mut c);
        dst.copy_from_slice(src);
        c
    }

    pub fn write_config(data: &mut [u8], c: &GauntletConfig) {
        let src = bytemuck::bytes_of(c);
        let dst = &mut data[HEADER_LEN..HEADER_LEN + CONFIG_LEN];
        dst.copy_from_slice(src);
    }
}

// 8. mod entropy
pub mod entropy {
    use crate::error::GauntletError;
    use arrayref::array_ref;
    use solana_program::{account_info::AccountInfo, program_error::ProgramError, sysvar};

    /// Find a slot's hash in raw SlotHashes sysvar data: u64 entry count,
    /// then (u64 slot, 32-byte hash) pairs sorted newest-first.
    pub fn find_slot_hash(data: &[u8], slot: u64) -> Option<[u8; 32]> {
        if data.len() < 8 {
            return None;
        }
        let count = u64::from_le_bytes(*array_ref![data, 0, 8]) as usize;
        let mut off = 8usize;
        for _ in 0..count {
            if data.len() < off + 40 {
                return None;
            }
            let entry_slot = u64::from_le_bytes(*array_ref![data, off, 8]);
            if entry_slot == slot {
                return Some(*array_ref![data, off + 8, 32]);
            }
            if entry_slot < slot {
                return None;
            }
            off += 40;
        }
        None
    }

    pub fn read_slot_hash(ai: &AccountInfo, slot: u64) -> Result<[u8; 32], ProgramError> {
        if *ai.key != sysvar::slot_hashes::ID {
            return Err(GauntletError::InvalidSysvar.into());
        }
        let data = ai.try_borrow_data()?;
        find_slot_hash(&data, slot).ok_or_else(|| GauntletError::EntropyUnavailable.into())
    }
}

// 9. mod grants (ed25519 boost-grant verification)
pub mod grants {
    use crate::constants::GRANT_MSG_LEN;
    use crate::error::GauntletError;
    use solana_program::{account_info::AccountInfo, program_error::ProgramError, pubkey::Pubkey};

    pub fn grant_message(
        owner: &Pubkey,
        kind: u8,
        magnitude_bps: u16,
        expiry_slot: u64,
        nonce: u64,
    ) -> [u8; GRANT_MSG_LEN] {
        let mut msg = [0u8; GRANT_MSG_LEN];
        msg[0..32].copy_from_slice(owner.as_ref());
        msg[32] = kind;
        msg[33..35].copy_from_slice(&magnitude_bps.to_le_bytes());
        msg[35..43].copy_from_slice(&expiry_slot.to_le_bytes());
        msg[43..51].copy_from_slice(&nonce.to_le_bytes());
        msg
    }

    /* Ed25519 instruction data layout:
     * num_signatures: u8
     * padding: u8
     * signature_offset: u16
     * signature_instruction_index: u16
     * public_key_offset: u16
     * public_key_instruction_index: u16
     * message_data_offset: u16
     * message_data_size: u16
     * message_instruction_index: u16
     * ... signature, public key, message ...
     */
    pub fn check_ed25519_ix_data(
        data: &[u8],
        expected_pubkey: &[u8; 32],
        expected_msg: &[u8],
    ) -> Result<(), ProgramError> {
        if data.len() < 16 {
            return Err(GauntletError::GrantSignatureMalformed.into());
        }
        if data[0] == 0 {
            return Err(GauntletError::GrantSignatureMalformed.into());
        }

        let pubkey_off = u16::from_le_bytes(data[6..8].try_into().unwrap()) as usize;
        let pubkey_ix = u16::from_le_bytes(data[8..10].try_into().unwrap());
        let msg_off = u16::from_le_bytes(data[10..12].try_into().unwrap()) as usize;
        let msg_size = u16::from_le_bytes(data[12..14].try_into().unwrap()) as usize;
        let msg_ix = u16::from_le_bytes(data[14..16].try_into().unwrap());

        // Self-contained instruction only: no cross-instruction references.
        if pubkey_ix != u16::MAX || msg_ix != u16::MAX {
            return Err(GauntletError::GrantSignatureMalformed.into());
        }
        if data.len() < pubkey_off + 32 || data.len() < msg_off + msg_size {
            return Err(GauntletError::GrantSignatureMalformed.into());
        }

        if &data[pubkey_off..pubkey_off + 32] != expected_pubkey {
            return Err(GauntletError::GrantSignerMismatch.into());
        }
        if &data[msg_off..msg_off + msg_size] != expected_msg {
            return Err(GauntletError::GrantMessageMismatch.into());
        }
        Ok(())
    }

    /// Verify that the instruction immediately preceding the current one is
    /// an ed25519_program verification of `expected_msg` under the registered
    /// authorizer key. The runtime has already verified the signature itself.
    #[cfg(not(any(test, feature = "test")))]
    pub fn verify_grant(
        ix_sysvar: &AccountInfo,
        expected_pubkey: &[u8; 32],
        expected_msg: &[u8],
    ) -> Result<(), ProgramError> {
        use solana_program::sysvar::instructions::{
            load_current_index_checked, load_instruction_at_checked,
        };

        let current_idx = load_current_index_checked(ix_sysvar)? as usize;
        if current_idx == 0 {
            return Err(GauntletError::GrantSignatureMissing.into());
        }
        let prev_ix = load_instruction_at_checked(current_idx - 1, ix_sysvar)?;
        if prev_ix.program_id != solana_program::ed25519_program::ID {
            return Err(GauntletError::GrantSignatureMissing.into());
        }
        check_ed25519_ix_data(&prev_ix.data, expected_pubkey, expected_msg)
    }

    /// Test builds read the ed25519 instruction data directly from the
    /// account payload; the offset/pubkey/message checks are identical.
    #[cfg(any(test, feature = "test"))]
    pub fn verify_grant(
        ix_sysvar: &AccountInfo,
        expected_pubkey: &[u8; 32],
        expected_msg: &[u8],
    ) -> Result<(), ProgramError> {
        use solana_program::sysvar;
        if *ix_sysvar.key != sysvar::instructions::ID {
            return Err(GauntletError::InvalidSysvar.into());
        }
        let data = ix_sysvar.try_borrow_data()?;
        if data.is_empty() {
            return Err(GauntletError::GrantSignatureMissing.into());
        }
        check_ed25519_ix_data(&data, expected_pubkey, expected_msg)
    }
}

// 10. mod collateral
pub mod collateral {
    use solana_program::{account_info::AccountInfo, program_error::ProgramError};

    #[cfg(not(any(test, feature = "test")))]
    use solana_program::program::{invoke, invoke_signed};

    #[cfg(any(test, feature = "test"))]
    use solana_program::program_pack::Pack;
    #[cfg(any(test, feature = "test"))]
    use spl_token::state::Account as TokenAccount;

    pub fn deposit<'a>(
        _token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
    ) -> Result<(), ProgramError> {
        #[cfg(not(any(test, feature = "test")))]
        {
            let ix = spl_token::instruction::transfer(
                _token_program.key,
                source.key,
                dest.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke(
                &ix,
                &[
                    source.clone(),
                    dest.clone(),
                    _authority.clone(),
                    _token_program.clone(),
                ],
            )
        }
        #[cfg(any(test, feature = "test"))]
        {
            let mut src_data = source.try_borrow_mut_data()?;
            let mut src_state = TokenAccount::unpack(&src_data)?;
            src_state.amount = src_state
                .amount
                .checked_sub(amount)
                .ok_or(ProgramError::InsufficientFunds)?;
            TokenAccount::pack(src_state, &mut src_data)?;

            let mut dst_data = dest.try_borrow_mut_data()?;
            let mut dst_state = TokenAccount::unpack(&dst_data)?;
            dst_state.amount = dst_state
                .amount
                .checked_add(amount)
                .ok_or(ProgramError::InvalidAccountData)?;
            TokenAccount::pack(dst_state, &mut dst_data)?;
            Ok(())
        }
    }

    pub fn withdraw<'a>(
        _token_program: &AccountInfo<'a>,
        source: &AccountInfo<'a>,
        dest: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
        _signer_seeds: &[&[&[u8]]],
    ) -> Result<(), ProgramError> {
        #[cfg(not(any(test, feature = "test")))]
        {
            let ix = spl_token::instruction::transfer(
                _token_program.key,
                source.key,
                dest.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke_signed(
                &ix,
                &[
                    source.clone(),
                    dest.clone(),
                    _authority.clone(),
                    _token_program.clone(),
                ],
                _signer_seeds,
            )
        }
        #[cfg(any(test, feature = "test"))]
        {
            let mut src_data = source.try_borrow_mut_data()?;
            let mut src_state = TokenAccount::unpack(&src_data)?;
            src_state.amount = src_state
                .amount
                .checked_sub(amount)
                .ok_or(ProgramError::InsufficientFunds)?;
            TokenAccount::pack(src_state, &mut src_data)?;

            let mut dst_data = dest.try_borrow_mut_data()?;
            let mut dst_state = TokenAccount::unpack(&dst_data)?;
            dst_state.amount = dst_state
                .amount
                .checked_add(amount)
                .ok_or(ProgramError::InvalidAccountData)?;
            TokenAccount::pack(dst_state, &mut dst_data)?;
            Ok(())
        }
    }

    /// Destroy the burn share of a finalized scan from the vault.
    pub fn burn<'a>(
        _token_program: &AccountInfo<'a>,
        vault: &AccountInfo<'a>,
        _mint: &AccountInfo<'a>,
        _authority: &AccountInfo<'a>,
        amount: u64,
        _signer_seeds: &[&[&[u8]]],
    ) -> Result<(), ProgramError> {
        #[cfg(not(any(test, feature = "test")))]
        {
            let ix = spl_token::instruction::burn(
                _token_program.key,
                vault.key,
                _mint.key,
                _authority.key,
                &[],
                amount,
            )?;
            invoke_signed(
                &ix,
                &[
                    vault.clone(),
                    _mint.clone(),
                    _authority.clone(),
                    _token_program.clone(),
                ],
                _signer_seeds,
            )
        }
        #[cfg(any(test, feature = "test"))]
        {
            let mut data = vault.try_borrow_mut_data()?;
            let mut state = TokenAccount::unpack(&data)?;
            state.amount = state
                .amount
                .checked_sub(amount)
                .ok_or(ProgramError::InsufficientFunds)?;
            TokenAccount::pack(state, &mut data)?;
            Ok(())
        }
    }
}

// 11. mod processor
pub mod processor {
    use crate::{
        accounts, collateral,
        constants::{MAGIC, SLAB_LEN, VERSION},
        engine::{GauntletEngine, NoOpModifier, MAX_POSITIONS, SCAN_COMMITTED},
        entropy,
        error::{map_ledger_error, GauntletError},
        grants, ix::Instruction, state,
        state::{GauntletConfig, SlabHeader},
        zc,
    };
    use solana_program::{
        account_info::AccountInfo,
        entrypoint::ProgramResult,
        msg,
        program_error::ProgramError,
        program_pack::Pack,
        pubkey::Pubkey,
        sysvar::{clock::Clock, Sysvar},
    };

    fn slab_guard(program_id: &Pubkey, slab: &AccountInfo, data: &[u8]) -> Result<(), ProgramError> {
        accounts::expect_owner(slab, program_id)?;
        if data.len() != SLAB_LEN {
            return Err(GauntletError::InvalidSlabLen.into());
        }
        Ok(())
    }

    fn require_initialized(data: &[u8]) -> Result<(), ProgramError> {
        let h = state::read_header(data);
        if h.magic != MAGIC {
            return Err(GauntletError::NotInitialized.into());
        }
        if h.version != VERSION {
            return Err(GauntletError::InvalidVersion.into());
        }
        Ok(())
    }

    fn require_admin(data: &[u8], signer: &AccountInfo) -> Result<(), ProgramError> {
        let h = state::read_header(data);
        if Pubkey::new_from_array(h.admin) != *signer.key {
            return Err(GauntletError::AdminOnly.into());
        }
        Ok(())
    }

    fn check_idx(engine: &GauntletEngine, idx: u16) -> Result<(), ProgramError> {
        if (idx as usize) >= MAX_POSITIONS || !engine.is_used(idx as usize) {
            return Err(GauntletError::EnginePositionNotFound.into());
        }
        Ok(())
    }

    fn check_position_owner(
        engine: &GauntletEngine,
        idx: u16,
        signer: &AccountInfo,
    ) -> Result<(), ProgramError> {
        check_idx(engine, idx)?;
        let owner = engine.positions[idx as usize].owner;
        if Pubkey::new_from_array(owner) != *signer.key {
            return Err(GauntletError::OwnerMismatch.into());
        }
        Ok(())
    }

    fn verify_vault(
        a_vault: &AccountInfo,
        expected_owner: &Pubkey,
        expected_mint: &Pubkey,
        expected_pubkey: &Pubkey,
    ) -> Result<(), ProgramError> {
        if a_vault.key != expected_pubkey {
            return Err(GauntletError::InvalidVaultAta.into());
        }
        if a_vault.owner != &spl_token::ID {
            return Err(GauntletError::InvalidVaultAta.into());
        }
        if a_vault.data_len() != spl_token::state::Account::LEN {
            return Err(GauntletError::InvalidVaultAta.into());
        }

        let data = a_vault.try_borrow_data()?;
        let tok = spl_token::state::Account::unpack(&data)?;
        if tok.mint != *expected_mint {
            return Err(GauntletError::InvalidMint.into());
        }
        if tok.owner != *expected_owner {
            return Err(GauntletError::InvalidVaultAta.into());
        }
        Ok(())
    }

    fn verify_config_vault(
        program_id: &Pubkey,
        slab_key: &Pubkey,
        config: &GauntletConfig,
        a_vault: &AccountInfo,
    ) -> Result<(), ProgramError> {
        let (auth, _) = accounts::derive_vault_authority(program_id, slab_key);
        verify_vault(
            a_vault,
            &auth,
            &Pubkey::new_from_array(config.collateral_mint),
            &Pubkey::new_from_array(config.vault_pubkey),
        )
    }

    pub fn process_instruction<'a, 'b>(
        program_id: &Pubkey,
        accounts: &'b [AccountInfo<'a>],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = Instruction::decode(instruction_data)?;

        match instruction {
            Instruction::InitGauntlet {
                authorizer,
                emission_authority,
                keeper,
                engine_params,
            } => {
                accounts::expect_len(accounts, 6)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                let a_mint = &accounts[2];
                let a_vault = &accounts[3];
                let a_clock = &accounts[5];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;

                let _ = zc::engine_mut(&mut data)?;

                let header = state::read_header(&data);
                if header.magic == MAGIC {
                    return Err(GauntletError::AlreadyInitialized.into());
                }

                GauntletEngine::validate_engine_params(&engine_params)
                    .map_err(map_ledger_error)?;

                let (auth, bump) = accounts::derive_vault_authority(program_id, a_slab.key);
                verify_vault(a_vault, &auth, a_mint.key, a_vault.key)?;

                let clock = Clock::from_account_info(a_clock)?;

                for b in data.iter_mut() {
                    *b = 0;
                }

                let engine = GauntletEngine::new(engine_params, clock.slot);
                zc::engine_write(&mut data, engine)?;

                let config = GauntletConfig {
                    collateral_mint: a_mint.key.to_bytes(),
                    vault_pubkey: a_vault.key.to_bytes(),
                    authorizer: authorizer.to_bytes(),
                    emission_authority: emission_authority.to_bytes(),
                    keeper: keeper.to_bytes(),
                    vault_authority_bump: bump,
                    _padding: [0; 7],
                };
                state::write_config(&mut data, &config);

                let new_header = SlabHeader {
                    magic: MAGIC,
                    version: VERSION,
                    bump,
                    _padding: [0; 3],
                    admin: a_admin.key.to_bytes(),
                    _reserved: [0; 16],
                };
                state::write_header(&mut data, &new_header);
            }
            Instruction::InitTier { tier, params } => {
                accounts::expect_len(accounts, 3)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                let a_clock = &accounts[2];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                require_admin(&data, a_admin)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;
                engine
                    .init_tier(tier, params, clock.slot)
                    .map_err(map_ledger_error)?;
            }
            Instruction::UpdateTierParams { tier, params } => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                require_admin(&data, a_admin)?;

                let engine = zc::engine_mut(&mut data)?;
                engine
                    .update_tier_params(tier, params)
                    .map_err(map_ledger_error)?;
            }
            Instruction::Deposit { tier, amount } => {
                accounts::expect_len(accounts, 6)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_owner_ata = &accounts[2];
                let a_vault = &accounts[3];
                let a_token = &accounts[4];
                let a_clock = &accounts[5];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;

                collateral::deposit(a_token, a_owner_ata, a_vault, a_owner, amount)?;

                let idx = engine
                    .deposit(a_owner.key.to_bytes(), tier, amount as u128, clock.slot)
                    .map_err(map_ledger_error)?;
                msg!("position_opened: {}", idx);
            }
            Instruction::TopUp { pos_idx, amount } => {
                accounts::expect_len(accounts, 6)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_owner_ata = &accounts[2];
                let a_vault = &accounts[3];
                let a_token = &accounts[4];
                let a_clock = &accounts[5];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;
                check_position_owner(engine, pos_idx, a_owner)?;

                collateral::deposit(a_token, a_owner_ata, a_vault, a_owner, amount)?;

                engine
                    .top_up(pos_idx, amount as u128, clock.slot)
                    .map_err(map_ledger_error)?;
            }
            Instruction::Withdraw { pos_idx } => {
                accounts::expect_len(accounts, 7)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_owner_ata = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];
                let a_clock = &accounts[6];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);

                let (derived_pda, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &derived_pda)?;
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;
                check_position_owner(engine, pos_idx, a_owner)?;

                let payout = engine
                    .withdraw(pos_idx, clock.slot)
                    .map_err(map_ledger_error)?;
                let payout_u64: u64 = payout
                    .try_into()
                    .map_err(|_| GauntletError::EngineOverflow)?;

                let seed1: &[u8] = b"vault";
                let seed2: &[u8] = a_slab.key.as_ref();
                let bump_arr: [u8; 1] = [config.vault_authority_bump];
                let seed3: &[u8] = &bump_arr;
                let seeds: [&[u8]; 3] = [seed1, seed2, seed3];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                collateral::withdraw(
                    a_token,
                    a_vault,
                    a_owner_ata,
                    a_vault_pda,
                    payout_u64,
                    &signer_seeds,
                )?;
            }
            Instruction::ClaimReward { pos_idx } => {
                accounts::expect_len(accounts, 7)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_owner_ata = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);

                let (derived_pda, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &derived_pda)?;
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let engine = zc::engine_mut(&mut data)?;
                check_position_owner(engine, pos_idx, a_owner)?;

                let payout = engine.claim_reward(pos_idx).map_err(map_ledger_error)?;
                if payout > 0 {
                    let payout_u64: u64 = payout
                        .try_into()
                        .map_err(|_| GauntletError::EngineOverflow)?;

                    let seed1: &[u8] = b"vault";
                    let seed2: &[u8] = a_slab.key.as_ref();
                    let bump_arr: [u8; 1] = [config.vault_authority_bump];
                    let seed3: &[u8] = &bump_arr;
                    let seeds: [&[u8]; 3] = [seed1, seed2, seed3];
                    let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                    collateral::withdraw(
                        a_token,
                        a_vault,
                        a_owner_ata,
                        a_vault_pda,
                        payout_u64,
                        &signer_seeds,
                    )?;
                }
            }
            Instruction::ApplyBoost {
                pos_idx,
                kind,
                magnitude_bps,
                expiry_slot,
                nonce,
            } => {
                accounts::expect_len(accounts, 4)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_clock = &accounts[2];
                let a_ix_sysvar = &accounts[3];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);

                // The grant is bound to the transaction signer; a grant issued
                // to another owner fails the message comparison.
                let msg_bytes =
                    grants::grant_message(a_owner.key, kind, magnitude_bps, expiry_slot, nonce);
                grants::verify_grant(a_ix_sysvar, &config.authorizer, &msg_bytes)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;
                check_position_owner(engine, pos_idx, a_owner)?;

                engine
                    .apply_boost(pos_idx, kind, magnitude_bps, expiry_slot, nonce, clock.slot)
                    .map_err(map_ledger_error)?;
                msg!("boost_applied");
            }
            Instruction::EmergencyWithdraw { pos_idx } => {
                accounts::expect_len(accounts, 6)?;
                let a_owner = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_owner_ata = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];

                accounts::expect_signer(a_owner)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);

                let (derived_pda, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &derived_pda)?;
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let engine = zc::engine_mut(&mut data)?;
                check_position_owner(engine, pos_idx, a_owner)?;

                let principal = engine
                    .emergency_withdraw(pos_idx)
                    .map_err(map_ledger_error)?;
                let principal_u64: u64 = principal
                    .try_into()
                    .map_err(|_| GauntletError::EngineOverflow)?;

                let seed1: &[u8] = b"vault";
                let seed2: &[u8] = a_slab.key.as_ref();
                let bump_arr: [u8; 1] = [config.vault_authority_bump];
                let seed3: &[u8] = &bump_arr;
                let seeds: [&[u8]; 3] = [seed1, seed2, seed3];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                collateral::withdraw(
                    a_token,
                    a_vault,
                    a_owner_ata,
                    a_vault_pda,
                    principal_u64,
                    &signer_seeds,
                )?;
            }
            Instruction::CreditEmission { tier, amount } => {
                accounts::expect_len(accounts, 5)?;
                let a_distributor = &accounts[0];
                let a_slab = &accounts[1];
                let a_source_ata = &accounts[2];
                let a_vault = &accounts[3];
                let a_token = &accounts[4];

                accounts::expect_signer(a_distributor)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);
                if Pubkey::new_from_array(config.emission_authority) != *a_distributor.key {
                    return Err(GauntletError::EmissionAuthorityOnly.into());
                }
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let engine = zc::engine_mut(&mut data)?;
                let credited = engine
                    .credit_emission(tier, amount as u128)
                    .map_err(map_ledger_error)?;
                if credited {
                    collateral::deposit(a_token, a_source_ata, a_vault, a_distributor, amount)?;
                } else {
                    // Empty tier: take nothing so the distributor can retry.
                    msg!("emission_skipped_empty_tier");
                }
            }
            Instruction::CommitScan { tier } => {
                accounts::expect_len(accounts, 4)?;
                let a_caller = &accounts[0];
                let a_slab = &accounts[1];
                let a_clock = &accounts[2];
                let a_slot_hashes = &accounts[3];

                accounts::expect_signer(a_caller)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;

                if tier >= engine.params.num_tiers {
                    return Err(GauntletError::EngineInvalidTier.into());
                }
                if engine.scans[tier as usize].phase == SCAN_COMMITTED {
                    let entropy_slot = engine.scans[tier as usize].entropy_slot;
                    if clock.slot <= entropy_slot {
                        return Err(GauntletError::EngineEntropyNotReady.into());
                    }
                    let hash = entropy::read_slot_hash(a_slot_hashes, entropy_slot)?;
                    engine
                        .capture_entropy(tier, hash, clock.slot)
                        .map_err(map_ledger_error)?;
                    msg!("scan_verifying");
                } else {
                    let scan_id = engine
                        .commit_scan(tier, clock.slot)
                        .map_err(map_ledger_error)?;
                    msg!("scan_committed: {}", scan_id);
                }
            }
            Instruction::SubmitElimination { tier, pos_idx } => {
                accounts::expect_len(accounts, 3)?;
                let a_keeper = &accounts[0];
                let a_slab = &accounts[1];
                let a_clock = &accounts[2];

                accounts::expect_signer(a_keeper)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);
                if Pubkey::new_from_array(config.keeper) != *a_keeper.key {
                    return Err(GauntletError::KeeperOnly.into());
                }

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;

                let applied = engine
                    .submit_elimination(tier, pos_idx, &NoOpModifier, clock.slot)
                    .map_err(map_ledger_error)?;
                if applied {
                    msg!("eliminated: {}", pos_idx);
                }
            }
            Instruction::FinalizeScan { tier } => {
                accounts::expect_len(accounts, 7)?;
                let a_caller = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_mint = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];
                let a_clock = &accounts[6];

                accounts::expect_signer(a_caller)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                let config = state::read_config(&data);

                let (derived_pda, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &derived_pda)?;
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;
                accounts::expect_key(a_mint, &Pubkey::new_from_array(config.collateral_mint))?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;

                let outcome = engine
                    .finalize_scan(tier, clock.slot)
                    .map_err(map_ledger_error)?;

                if outcome.burned > 0 {
                    let burned_u64: u64 = outcome
                        .burned
                        .try_into()
                        .map_err(|_| GauntletError::EngineOverflow)?;

                    let seed1: &[u8] = b"vault";
                    let seed2: &[u8] = a_slab.key.as_ref();
                    let bump_arr: [u8; 1] = [config.vault_authority_bump];
                    let seed3: &[u8] = &bump_arr;
                    let seeds: [&[u8]; 3] = [seed1, seed2, seed3];
                    let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                    collateral::burn(
                        a_token,
                        a_vault,
                        a_mint,
                        a_vault_pda,
                        burned_u64,
                        &signer_seeds,
                    )?;
                }
                msg!("scan_finalized: {}", outcome.scan_id);
            }
            Instruction::AdvanceEpoch => {
                accounts::expect_len(accounts, 3)?;
                let a_caller = &accounts[0];
                let a_slab = &accounts[1];
                let a_clock = &accounts[2];

                accounts::expect_signer(a_caller)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;

                let clock = Clock::from_account_info(a_clock)?;
                let engine = zc::engine_mut(&mut data)?;
                let epoch = engine
                    .advance_epoch(clock.slot)
                    .map_err(map_ledger_error)?;
                msg!("epoch_advanced: {}", epoch);
            }
            Instruction::Pause => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                require_admin(&data, a_admin)?;

                let engine = zc::engine_mut(&mut data)?;
                engine.pause().map_err(map_ledger_error)?;
            }
            Instruction::Unpause => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                require_admin(&data, a_admin)?;

                let engine = zc::engine_mut(&mut data)?;
                engine.unpause().map_err(map_ledger_error)?;
            }
            Instruction::SetAuthorizer { new_key } => {
                accounts::expect_len(accounts, 2)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                require_admin(&data, a_admin)?;

                let mut config = state::read_config(&data);
                config.authorizer = new_key.to_bytes();
                state::write_config(&mut data, &config);
            }
            Instruction::CollectRevenue { amount } => {
                accounts::expect_len(accounts, 6)?;
                let a_admin = &accounts[0];
                let a_slab = &accounts[1];
                let a_vault = &accounts[2];
                let a_admin_ata = &accounts[3];
                let a_vault_pda = &accounts[4];
                let a_token = &accounts[5];

                accounts::expect_signer(a_admin)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;
                require_admin(&data, a_admin)?;
                let config = state::read_config(&data);

                let (derived_pda, _) = accounts::derive_vault_authority(program_id, a_slab.key);
                accounts::expect_key(a_vault_pda, &derived_pda)?;
                verify_config_vault(program_id, a_slab.key, &config, a_vault)?;

                let engine = zc::engine_mut(&mut data)?;
                engine
                    .collect_revenue(amount as u128)
                    .map_err(map_ledger_error)?;

                let seed1: &[u8] = b"vault";
                let seed2: &[u8] = a_slab.key.as_ref();
                let bump_arr: [u8; 1] = [config.vault_authority_bump];
                let seed3: &[u8] = &bump_arr;
                let seeds: [&[u8]; 3] = [seed1, seed2, seed3];
                let signer_seeds: [&[&[u8]]; 1] = [&seeds];

                collateral::withdraw(
                    a_token,
                    a_vault,
                    a_admin_ata,
                    a_vault_pda,
                    amount,
                    &signer_seeds,
                )?;
            }
            Instruction::ReapPosition { pos_idx } => {
                accounts::expect_len(accounts, 2)?;
                let a_caller = &accounts[0];
                let a_slab = &accounts[1];

                accounts::expect_signer(a_caller)?;
                accounts::expect_writable(a_slab)?;

                let mut data = state::slab_data_mut(a_slab)?;
                slab_guard(program_id, a_slab, &data)?;
                require_initialized(&data)?;

                let engine = zc::engine_mut(&mut data)?;
                check_idx(engine, pos_idx)?;
                engine.reap(pos_idx).map_err(map_ledger_error)?;
            }
        }
        Ok(())
    }
}

// 12. mod entrypoint
#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint {
    use crate::processor;
    use solana_program::{
        account_info::AccountInfo, entrypoint, entrypoint::ProgramResult, pubkey::Pubkey,
    };

    entrypoint!(process_instruction);

    fn process_instruction<'a>(
        program_id: &Pubkey,
        accounts: &'a [AccountInfo<'a>],
        instruction_data: &[u8],
    ) -> ProgramResult {
        processor::process_instruction(program_id, accounts, instruction_data)
    }
}
