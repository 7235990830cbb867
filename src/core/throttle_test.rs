use std::time::Duration;

use crate::config::ThrottleOptions;
use crate::ThrottleVerdict;
use crate::ThrottlingController;

fn controller(
    enabled: bool,
    qps_limit: u64,
) -> ThrottlingController {
    ThrottlingController::new(ThrottleOptions {
        enabled,
        qps_limit,
        delay_ms: 50,
    })
}

#[test]
fn test_disabled_controller_never_throttles() {
    let mut c = controller(false, 1);
    for _ in 0..100 {
        assert_eq!(c.verdict(1000), ThrottleVerdict::NotThrottled);
    }
}

#[test]
fn test_delay_band_starts_at_half_limit() {
    let mut c = controller(true, 10);
    for _ in 0..5 {
        assert_eq!(c.verdict(1000), ThrottleVerdict::NotThrottled);
    }
    assert_eq!(
        c.verdict(1000),
        ThrottleVerdict::Delay(Duration::from_millis(50))
    );
}

#[test]
fn test_reject_band_starts_at_limit() {
    let mut c = controller(true, 4);
    for _ in 0..4 {
        assert_ne!(c.verdict(1000), ThrottleVerdict::Reject);
    }
    assert_eq!(c.verdict(1000), ThrottleVerdict::Reject);
    assert_eq!(c.verdict(1000), ThrottleVerdict::Reject);
}

#[test]
fn test_window_rolls_over_each_second() {
    let mut c = controller(true, 4);
    for _ in 0..5 {
        c.verdict(1000);
    }
    assert_eq!(c.verdict(1000), ThrottleVerdict::Reject);

    // A new second opens a fresh budget.
    assert_eq!(c.verdict(2100), ThrottleVerdict::NotThrottled);
}
