//! Benchmarks for indicator implementations.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use market_core::types::{Bar, Period, SymbolSeries};
use market_indicators::{simd, ChaikinMoneyFlow, IndicatorEngine};

fn generate_series(symbol: &str, size: usize) -> SymbolSeries {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let bars = (0..size)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let date = start + chrono::Duration::days(i as i64);
            Bar::on_date(date, close, close + 1.0, close - 1.0, close, 1_000.0 + i as f64)
        })
        .collect();
    SymbolSeries::new(symbol, Period::FiveYears, bars)
}

fn benchmark_money_flow_volume(c: &mut Criterion) {
    let mut group = c.benchmark_group("MFV");

    for size in [1000, 10000, 100000].iter() {
        let series = generate_series("XLK", *size);
        let (high, low, close, volume) = (
            series.highs(),
            series.lows(),
            series.closes(),
            series.volumes(),
        );

        group.bench_with_input(BenchmarkId::new("scalar", size), &series, |b, _| {
            b.iter(|| {
                (0..high.len())
                    .map(|i| simd::money_flow_multiplier(high[i], low[i], close[i]) * volume[i])
                    .collect::<Vec<f64>>()
            })
        });

        group.bench_with_input(BenchmarkId::new("simd", size), &series, |b, _| {
            b.iter(|| {
                simd::money_flow_volume_simd(
                    black_box(&high),
                    black_box(&low),
                    black_box(&close),
                    black_box(&volume),
                )
            })
        });
    }

    group.finish();
}

fn benchmark_cmf(c: &mut Criterion) {
    let mut group = c.benchmark_group("CMF");

    for size in [1000, 10000].iter() {
        let series = generate_series("XLK", *size);
        let cmf = ChaikinMoneyFlow::new(20);

        group.bench_with_input(BenchmarkId::new("series", size), &series, |b, series| {
            b.iter(|| cmf.calculate_series(black_box(series)))
        });
    }

    group.finish();
}

fn benchmark_engine(c: &mut Criterion) {
    let series = generate_series("XLK", 1260);
    let bench = generate_series("SPY", 1260);
    let engine = IndicatorEngine::default();

    c.bench_function("engine_5y", |b| {
        b.iter(|| engine.compute(black_box(&series), Some(black_box(&bench))))
    });
}

criterion_group!(benches, benchmark_money_flow_volume, benchmark_cmf, benchmark_engine);
criterion_main!(benches);
