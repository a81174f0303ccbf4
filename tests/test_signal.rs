use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use rstest::rstest;
use forecast_backtest::signal::{confidence_score, decide, direction_probability};
use forecast_backtest::{
    write_signals_csv, Direction, Forecast, ForecastError, ForecastStep, MarketContext,
    PositionSize, PredictionInterval, SignalGenerator, SignalThresholds,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn step(d: NaiveDate, point: f64, half_80: f64, half_95: f64) -> ForecastStep {
    ForecastStep {
        date: d,
        point,
        intervals: vec![
            PredictionInterval {
                level: 80,
                lower: point - half_80,
                upper: point + half_80,
            },
            PredictionInterval {
                level: 95,
                lower: point - half_95,
                upper: point + half_95,
            },
        ],
    }
}

#[test]
fn test_confidence_score() {
    // interval as wide as typical volatility
    assert_approx_eq!(confidence_score(0.02, 0.02), 80.0, 1e-12);
    // very tight interval
    assert_approx_eq!(confidence_score(0.0, 0.02), 100.0, 1e-12);
    // very wide interval clips at zero
    assert_approx_eq!(confidence_score(0.2, 0.02), 0.0, 1e-12);
    // unknown volatility yields no confidence
    assert_approx_eq!(confidence_score(0.02, 0.0), 0.0, 1e-12);
}

#[test]
fn test_direction_probability() {
    // move half the interval width
    assert_approx_eq!(direction_probability(0.01, 0.02), 75.0, 1e-12);
    // move dominates the interval, capped
    assert_approx_eq!(direction_probability(0.05, 0.02), 100.0, 1e-12);
    assert_approx_eq!(direction_probability(-0.05, 0.02), 100.0, 1e-12);
    // degenerate interval
    assert_approx_eq!(direction_probability(0.0, 0.0), 50.0, 1e-12);
    assert_approx_eq!(direction_probability(0.01, 0.0), 100.0, 1e-12);
}

#[test]
fn test_decide_holds_below_thresholds() {
    let thresholds = SignalThresholds::default();

    let (direction, size, reasons) = decide(59.9, 90.0, 1.0, 2.0, &thresholds);
    assert_eq!(direction, Direction::Hold);
    assert_eq!(size, PositionSize::None);
    assert!(reasons.iter().any(|r| r.contains("low confidence")));

    let (direction, size, reasons) = decide(90.0, 59.9, 1.0, 2.0, &thresholds);
    assert_eq!(direction, Direction::Hold);
    assert_eq!(size, PositionSize::None);
    assert!(reasons.iter().any(|r| r.contains("weak directional")));
}

#[test]
fn test_decide_trades_at_exact_thresholds() {
    let thresholds = SignalThresholds::default();

    // both gates sit exactly at their minimums
    let (direction, size, _) = decide(60.0, 60.0, 1.0, 2.0, &thresholds);
    assert_eq!(direction, Direction::Long);
    assert_eq!(size, PositionSize::Small);
}

#[test]
fn test_decide_direction_follows_sign() {
    let thresholds = SignalThresholds::default();

    let (direction, _, _) = decide(80.0, 80.0, 1.5, 2.0, &thresholds);
    assert_eq!(direction, Direction::Long);

    let (direction, _, _) = decide(80.0, 80.0, -1.5, 2.0, &thresholds);
    assert_eq!(direction, Direction::Short);
}

#[rstest]
#[case(75.0, 2.9, PositionSize::Large)] // high confidence, tight range
#[case(75.0, 3.0, PositionSize::Medium)] // range at the large cutoff drops a tier
#[case(74.9, 2.0, PositionSize::Medium)] // confidence just under the large floor
#[case(65.0, 4.9, PositionSize::Medium)] // moderate confidence and range
#[case(70.0, 5.0, PositionSize::Small)] // wide range falls back to small
#[case(62.0, 1.0, PositionSize::Small)] // below the medium floor despite a tight range
fn test_decide_position_sizing(
    #[case] confidence: f64,
    #[case] width_pct: f64,
    #[case] expected: PositionSize,
) {
    let thresholds = SignalThresholds::default();
    let (_, size, _) = decide(confidence, 90.0, 1.0, width_pct, &thresholds);
    assert_eq!(size, expected);
}

#[test]
fn test_market_context_validation() {
    assert!(MarketContext::new(100.0, 0.02).is_ok());
    assert!(matches!(
        MarketContext::new(0.0, 0.02),
        Err(ForecastError::InvalidParameter(_))
    ));
    assert!(matches!(
        MarketContext::new(100.0, -0.1),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_generate_long_signal() {
    let forecast = Forecast::new(vec![step(date(2023, 3, 2), 102.0, 1.0, 2.0)]).unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();
    let generator = SignalGenerator::new();

    let signal = generator.generate(&forecast, &context, 1).unwrap();

    assert_eq!(signal.day_index, 1);
    assert_eq!(signal.date, date(2023, 3, 2));
    assert_approx_eq!(signal.pct_change, 2.0, 1e-12);
    // width is 2% of price against 2% volatility
    assert_approx_eq!(signal.confidence_score, 80.0, 1e-12);
    assert_approx_eq!(signal.direction_probability, 100.0, 1e-12);
    assert_approx_eq!(signal.range_80_width_pct, 2.0, 1e-12);
    assert_eq!(signal.range_80, (101.0, 103.0));
    assert_eq!(signal.range_95, Some((100.0, 104.0)));

    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.position_size, PositionSize::Large);
    assert!(!signal.reasoning.is_empty());
}

#[test]
fn test_generate_hold_on_wide_interval() {
    // interval far wider than recent volatility
    let forecast = Forecast::new(vec![step(date(2023, 3, 2), 102.0, 10.0, 15.0)]).unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();
    let generator = SignalGenerator::new();

    let signal = generator.generate(&forecast, &context, 1).unwrap();

    assert_eq!(signal.direction, Direction::Hold);
    assert_eq!(signal.position_size, PositionSize::None);
}

#[test]
fn test_generate_requires_80_interval() {
    let only_95 = ForecastStep {
        date: date(2023, 3, 2),
        point: 102.0,
        intervals: vec![PredictionInterval {
            level: 95,
            lower: 100.0,
            upper: 104.0,
        }],
    };
    let forecast = Forecast::new(vec![only_95]).unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();
    let generator = SignalGenerator::new();

    assert!(matches!(
        generator.generate(&forecast, &context, 1),
        Err(ForecastError::InvalidParameter(_))
    ));
}

#[test]
fn test_generate_day_out_of_range() {
    let forecast = Forecast::new(vec![step(date(2023, 3, 2), 102.0, 1.0, 2.0)]).unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();
    let generator = SignalGenerator::new();

    assert!(generator.generate(&forecast, &context, 0).is_err());
    assert!(generator.generate(&forecast, &context, 2).is_err());
}

#[test]
fn test_generate_all() {
    let forecast = Forecast::new(vec![
        step(date(2023, 3, 2), 102.0, 1.0, 2.0),
        step(date(2023, 3, 3), 103.0, 1.5, 2.5),
    ])
    .unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();

    let signals = SignalGenerator::new().generate_all(&forecast, &context).unwrap();
    assert_eq!(signals.len(), 2);
    assert_eq!(signals[0].day_index, 1);
    assert_eq!(signals[1].day_index, 2);
}

#[test]
fn test_custom_thresholds() {
    let strict = SignalThresholds {
        min_confidence: 99.0,
        ..SignalThresholds::default()
    };
    let forecast = Forecast::new(vec![step(date(2023, 3, 2), 102.0, 1.0, 2.0)]).unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();

    let signal = SignalGenerator::with_thresholds(strict)
        .generate(&forecast, &context, 1)
        .unwrap();
    assert_eq!(signal.direction, Direction::Hold);
}

#[test]
fn test_write_signals_csv() {
    let forecast = Forecast::new(vec![step(date(2023, 3, 2), 102.0, 1.0, 2.0)]).unwrap();
    let context = MarketContext::new(100.0, 0.02).unwrap();
    let signals = SignalGenerator::new().generate_all(&forecast, &context).unwrap();

    let mut buffer = Vec::new();
    write_signals_csv(&signals, &mut buffer).unwrap();
    let output = String::from_utf8(buffer).unwrap();

    let header = output.lines().next().unwrap();
    assert_eq!(
        header,
        "day_index,date,predicted_price,pct_change,confidence_score,direction_probability,\
         range_80_low,range_80_high,range_95_low,range_95_high,signal,position_size,reasoning"
    );
    assert_eq!(output.lines().count(), signals.len() + 1);
}
