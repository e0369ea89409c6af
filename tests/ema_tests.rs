use sandbox_forecast::indicator::ema::{ema_series, ema_series_with_warmup, Ema};

#[test]
fn basic_ema() {
    let mut ema = Ema::new(3);
    assert_eq!(ema.period(), 3);
    assert!((ema.alpha() - 0.5).abs() < f64::EPSILON);

    let v = ema.push(2.0).unwrap();
    assert!((v - 2.0).abs() < f64::EPSILON);

    let v = ema.push(5.0).unwrap();
    assert!((v - 3.5).abs() < f64::EPSILON);

    let v = ema.push(8.0).unwrap();
    assert!((v - 5.75).abs() < f64::EPSILON);
}

#[test]
fn single_period() {
    let mut ema = Ema::new(1);
    let v = ema.push(42.0).unwrap();
    assert!((v - 42.0).abs() < f64::EPSILON);

    let v = ema.push(99.0).unwrap();
    assert!((v - 99.0).abs() < f64::EPSILON);
}

#[test]
fn warmup_hides_values_but_keeps_recursion() {
    let mut ema = Ema::with_min_periods(3, 3);
    assert_eq!(ema.value(), None);
    assert_eq!(ema.push(2.0), None);
    assert_eq!(ema.push(5.0), None);
    assert!(!ema.is_ready());
    let v = ema.push(8.0).unwrap();
    assert!((v - 5.75).abs() < f64::EPSILON);
    assert!(ema.is_ready());
}

#[test]
fn series_helpers_keep_length() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(ema_series(&values, 4).len(), values.len());

    let warm = ema_series_with_warmup(&values, 4, 4);
    assert_eq!(warm.len(), values.len());
    assert_eq!(warm.iter().filter(|v| v.is_none()).count(), 3);
}

#[test]
#[should_panic(expected = "EMA period must be > 0")]
fn zero_period_panics() {
    Ema::new(0);
}
