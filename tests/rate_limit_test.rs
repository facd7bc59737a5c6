//! Rate limiter integration tests
//!
//! Clock readings are passed explicitly so window expiry is deterministic.

use std::time::{Duration, Instant};

use markdown_format_converter::config::Config;
use markdown_format_converter::rate_limit::RateLimiter;

#[test]
fn test_window_admits_again_after_expiry() {
    let mut limiter = RateLimiter::new(2, Duration::from_millis(1000));
    let start = Instant::now();

    assert!(limiter.can_make_request_at(start));
    assert!(limiter.can_make_request_at(start + Duration::from_millis(10)));
    assert!(!limiter.can_make_request_at(start + Duration::from_millis(20)));
    assert_eq!(limiter.remaining_requests_at(start + Duration::from_millis(20)), 0);

    // only the first request has aged out
    let later = start + Duration::from_millis(1005);
    assert_eq!(limiter.remaining_requests_at(later), 1);
    assert!(limiter.can_make_request_at(later));
    assert!(!limiter.can_make_request_at(later));
}

#[test]
fn test_refusals_do_not_consume_capacity() {
    let mut limiter = RateLimiter::new(1, Duration::from_millis(500));
    let start = Instant::now();

    assert!(limiter.can_make_request_at(start));
    for step in 1..10 {
        assert!(!limiter.can_make_request_at(start + Duration::from_millis(step * 10)));
    }
    assert!(limiter.can_make_request_at(start + Duration::from_millis(500)));
}

#[test]
fn test_limiter_from_config() {
    let config = Config::from_toml("[rate_limit]\nmax_requests = 3\nwindow_ms = 250\n").unwrap();
    let mut limiter = config.rate_limiter();
    assert_eq!(limiter.max_requests(), 3);
    assert_eq!(limiter.window(), Duration::from_millis(250));

    let now = Instant::now();
    assert_eq!(limiter.remaining_requests_at(now), 3);
    for _ in 0..3 {
        assert!(limiter.can_make_request_at(now));
    }
    assert!(!limiter.can_make_request_at(now));
}
