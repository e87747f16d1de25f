use test_strategy::proptest;

use base::TimingConfig;

use super::*;

fn config_16mhz() -> TimingConfig {
    TimingConfig {
        target_clock_hz: 16_000_000,
        ..TimingConfig::default()
    }
}

#[test]
fn test_scheduler_splits_frame_over_elapsed_milliseconds() {
    let scheduler = TickScheduler::new(&config_16mhz());
    let budget = scheduler.plan(16);
    assert_eq!(
        budget,
        CycleBudget {
            dt: 16,
            cycles_per_ms: 16_666,
            remainder: 10,
        }
    );
    let shares: Vec<u64> = budget.shares().collect();
    assert_eq!(shares.len(), 16);
    assert!(shares[..15].iter().all(|s| *s == 16_666));
    assert_eq!(shares[15], 16_676);
    assert_eq!(shares.iter().sum::<u64>(), 266_666);
    assert_eq!(budget.total(), 266_666);
}

#[test]
fn test_zero_elapsed_time_counts_as_one_millisecond() {
    let scheduler = TickScheduler::new(&config_16mhz());
    let budget = scheduler.plan(0);
    assert_eq!(budget.dt, 1);
    assert_eq!(budget.cycles_per_ms, 266_666);
    assert_eq!(budget.remainder, 0);
    assert_eq!(budget.shares().collect::<Vec<_>>(), vec![266_666]);
}

#[test]
fn test_long_frame_puts_whole_frame_in_remainder_when_needed() {
    // More milliseconds than cycles: every slice but the last is empty.
    let config = TimingConfig {
        target_clock_hz: 600,
        ..TimingConfig::default()
    };
    let budget = TickScheduler::new(&config).plan(25);
    assert_eq!(budget.cycles_per_ms, 0);
    assert_eq!(budget.remainder, 10);
    assert_eq!(budget.share(24), 10);
    assert_eq!(budget.total(), 10);
}

#[test]
fn test_autoadjust_first_converged_frame_reuses_initial_count() {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    assert_eq!(adjuster.last_cycle_count(), 1);
    // 1000/16 = 62 ticks per second, inside (50, 70).
    let budget = adjuster.plan(16);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::Converged));
    assert_eq!(budget.cycles_per_ms, 1);
    assert_eq!(budget.remainder, 1000);
    assert_eq!(adjuster.last_cycle_count(), 1001);
}

#[test]
fn test_autoadjust_converged_frames_carry_previous_count_forward() {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    adjuster.last_cycle_count = 20_000;
    for dt in [16, 17, 15, 16] {
        let previous = adjuster.last_cycle_count();
        let budget = adjuster.plan(dt);
        assert_eq!(budget.cycles_per_ms, previous);
        assert_eq!(budget.remainder, 1000);
        assert_eq!(adjuster.last_cycle_count(), previous + 1000);
    }
}

#[test]
fn test_within_tolerance_bounds() {
    let adjuster = CycleAutoAdjuster::new(&config_16mhz());
    assert!(!adjuster.within_tolerance(50));
    assert!(adjuster.within_tolerance(51));
    assert!(adjuster.within_tolerance(69));
    assert!(!adjuster.within_tolerance(70));
    assert!(!adjuster.within_tolerance(0));
    assert!(!adjuster.within_tolerance(u64::MAX));
}

#[test]
fn test_autoadjust_tolerance_band_is_exclusive() {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    // 1000/20 = 50, which is exactly target - tolerance: not converged.
    adjuster.last_cycle_count = 10_000;
    adjuster.plan(20);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::SlowCorrected));
    // 1000/14 = 71: above the band, so treated as fast.
    adjuster.plan(14);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::Fast));
}

#[test]
fn test_autoadjust_slow_frame_recomputes_from_measured_rate() {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    adjuster.last_cycle_count = 10_000;
    // 1000/40 = 25 ticks per second, well below target.
    // 40ms / 10000 cycles = 0.004 ms per cycle; (1000/60) / 0.004 = 4166.67.
    let budget = adjuster.plan(40);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::SlowCorrected));
    assert_eq!(budget.dt, 40);
    assert_eq!(budget.cycles_per_ms, 4166);
    assert_eq!(budget.remainder, 1000);
    assert_eq!(adjuster.last_cycle_count(), 5166);
}

#[test]
fn test_autoadjust_degenerate_rate_falls_back_to_scheduler() {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    adjuster.last_cycle_count = 0;
    let budget = adjuster.plan(40);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::SlowFallback));
    // Nominal: 266666 / 40 = 6666, but the remainder is dropped on the
    // slow path before the headroom is added.
    assert_eq!(budget.cycles_per_ms, 6666);
    assert_eq!(budget.remainder, 1000);
    assert_eq!(adjuster.last_cycle_count(), 7666);
}

#[test]
fn test_autoadjust_running_fast_is_deliberately_left_uncorrected() {
    // Running faster than the target never shrinks the budget: the
    // wait at the end of the frame caps the speed instead.  This
    // asymmetry is intentional.
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    adjuster.last_cycle_count = 5;
    let nominal = TickScheduler::new(&config_16mhz()).plan(5);
    let budget = adjuster.plan(5);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::Fast));
    assert_eq!(budget.cycles_per_ms, nominal.cycles_per_ms);
    assert_eq!(budget.remainder, nominal.remainder + 1000);
    assert_eq!(adjuster.last_cycle_count(), 53_333 + 1 + 1000);
}

#[test]
fn test_autoadjust_frame_shorter_than_tick_group_is_fast() {
    let config = TimingConfig {
        frames_per_tick_group: 2,
        ..config_16mhz()
    };
    let mut adjuster = CycleAutoAdjuster::new(&config);
    let budget = adjuster.plan(1);
    assert_eq!(adjuster.last_adjustment(), Some(Adjustment::Fast));
    assert_eq!(budget.dt, 1);
    assert_eq!(budget.cycles_per_ms, 266_666);
}

#[test]
fn test_strategy_dispatches_to_selected_planner() {
    let mut scheduled = BudgetStrategy::Scheduled(TickScheduler::new(&config_16mhz()));
    let mut adjusting = BudgetStrategy::AutoAdjust(CycleAutoAdjuster::new(&config_16mhz()));
    assert!(!scheduled.is_auto_adjusting());
    assert!(adjusting.is_auto_adjusting());
    assert_eq!(scheduled.plan(16).total(), 266_666);
    assert_eq!(adjusting.plan(16).total(), 16 + 1000);
}

#[proptest]
fn scheduler_total_is_exactly_one_frame(
    #[strategy(0..5000u64)] dt: u64,
    #[strategy(1..=100_000_000u64)] hz: u64,
    #[strategy(1..=1000u32)] tps: u32,
) {
    let config = TimingConfig {
        target_clock_hz: hz,
        ticks_per_second: tps,
        ..TimingConfig::default()
    };
    let budget = TickScheduler::new(&config).plan(dt);
    assert_eq!(budget.dt, clamp_dt(dt));
    assert!(budget.remainder < budget.dt);
    assert_eq!(budget.total(), hz / u64::from(tps));
    assert_eq!(budget.shares().sum::<u64>(), budget.total());
}

#[proptest]
fn autoadjusted_shares_always_sum_to_budget(
    #[strategy(proptest::collection::vec(0..500u64, 1..20))] dts: Vec<u64>,
    #[strategy(0..2_000_000u64)] initial: u64,
) {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    adjuster.last_cycle_count = initial;
    for dt in dts {
        let budget = adjuster.plan(dt);
        assert!(budget.dt >= 1);
        assert_eq!(
            budget.shares().sum::<u64>(),
            budget.cycles_per_ms * budget.dt + budget.remainder
        );
        assert_eq!(
            adjuster.last_cycle_count(),
            budget.cycles_per_ms + budget.remainder
        );
    }
}

#[proptest]
fn degenerate_history_never_leaks_into_budget(#[strategy(1..5000u64)] dt: u64) {
    let mut adjuster = CycleAutoAdjuster::new(&config_16mhz());
    adjuster.last_cycle_count = 0;
    let nominal = TickScheduler::new(&config_16mhz()).plan(dt);
    let budget = adjuster.plan(dt);
    match adjuster.last_adjustment() {
        Some(Adjustment::SlowFallback) => {
            assert_eq!(budget.cycles_per_ms, nominal.cycles_per_ms);
        }
        Some(Adjustment::Converged) => assert_eq!(budget.cycles_per_ms, 0),
        Some(Adjustment::Fast) => assert_eq!(budget.cycles_per_ms, nominal.cycles_per_ms),
        other => panic!("unexpected adjustment {other:?} for an empty history"),
    }
}
