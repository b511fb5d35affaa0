//! Tests the ordering that downgrade merges rely on.

use site_guard_core::PerformanceTier;

#[test]
fn tier_ordering_tests_min_merge_is_a_downgrade() {
    assert_eq!(PerformanceTier::High.min(PerformanceTier::Low), PerformanceTier::Low);
    assert_eq!(PerformanceTier::Medium.min(PerformanceTier::High), PerformanceTier::Medium);
    assert_eq!(PerformanceTier::default(), PerformanceTier::Medium);
}
