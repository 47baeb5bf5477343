use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;
use waterlevel_dashboard::{
    render, select_and_normalize, ChartOptions, Observation, SourceColumns, StationSheet,
};

const ROWS: usize = 2000;

fn raw_frame(code: &str) -> DataFrame {
    let columns = SourceColumns::default();
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let millis: Vec<i64> = (0..ROWS)
        .rev()
        .map(|i| (start + Duration::hours(i as i64)).and_utc().timestamp_millis())
        .collect();
    let level: Vec<Option<f64>> = (0..ROWS)
        .map(|i| (i % 50 != 0).then_some(1.0 + (i as f64 / 24.0).sin()))
        .collect();
    DataFrame::new(vec![
        Column::new(columns.timestamp.as_str().into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap(),
        Column::new(code.into(), level),
        Column::new(columns.pred_3h.as_str().into(), vec![1.23456f64; ROWS]),
        Column::new(columns.pred_6h.as_str().into(), vec![1.34567f64; ROWS]),
    ])
    .unwrap()
}

fn observations() -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..ROWS)
        .map(|i| Observation {
            timestamp: start + Duration::hours(i as i64),
            actual_level: (i % 7 != 0).then_some(1.0 + i as f64 * 0.001),
            pred_3h: Some(1.01 + i as f64 * 0.001),
            pred_6h: Some(1.02 + i as f64 * 0.001),
        })
        .collect()
}

fn bench_dashboard(c: &mut Criterion) {
    let station = StationSheet::parse("1018640_Station").unwrap();
    let columns = SourceColumns::default();
    let raw = raw_frame(station.code());
    c.bench_function("select_and_normalize", |b| {
        b.iter(|| select_and_normalize(black_box(&raw), &station, &columns))
    });

    let observations = observations();
    let options = ChartOptions::default();
    c.bench_function("render_chart", |b| {
        b.iter(|| render(black_box(&observations), station.name(), &options))
    });
}

criterion_group!(benches, bench_dashboard);
criterion_main!(benches);
