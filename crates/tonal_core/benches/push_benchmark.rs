//! Configuration push benchmarks
//!
//! Measures planning and applying pushes against the in-memory stub host.
//! Run with: cargo bench -p tonal_core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tonal_core::tonal_platform::stub::StubEffectHost;
use tonal_core::tonal_platform::GenericEffectSet;
use tonal_core::{
    keys, plan_push, push_configuration, AppliedState, ChangeFlags, DeviceConfiguration,
    DeviceConfigurationStore, MemoryConfigStore,
};

fn configuration() -> DeviceConfiguration {
    let store = MemoryConfigStore::new();
    for (key, value) in [
        (keys::GLOBAL_ENABLE, "true"),
        (keys::EQ_ENABLE, "true"),
        (keys::EQ_LEVELS, "3;1;0;-2;4"),
        (keys::BASS_ENABLE, "true"),
        (keys::BASS_STRENGTH, "400"),
        (keys::VIRTUALIZER_ENABLE, "true"),
        (keys::VIRTUALIZER_STRENGTH, "250"),
        (keys::REVERB_ENABLE, "true"),
        (keys::REVERB_PRESET, "2"),
    ] {
        store.put_string("speaker", key, value).unwrap();
    }
    DeviceConfiguration::load(&store, "speaker", 5)
}

fn benchmark_planning(c: &mut Criterion) {
    let host = StubEffectHost::new();
    let backend = GenericEffectSet::new(&host, 1).unwrap();
    let config = configuration();
    let fresh = AppliedState::default();

    c.bench_function("plan_push_all_fresh", |b| {
        b.iter(|| plan_push(black_box(&backend), ChangeFlags::ALL, &config, &fresh))
    });
}

fn benchmark_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_configuration");
    let host = StubEffectHost::new();
    let config = configuration();

    // Cold: every category written
    let mut backend = GenericEffectSet::new(&host, 2).unwrap();
    group.bench_function("full_cold", |b| {
        b.iter(|| {
            let mut applied = AppliedState::default();
            push_configuration(&mut backend, ChangeFlags::ALL, black_box(&config), &mut applied)
        })
    });

    // Warm: cache says everything is current
    let mut backend = GenericEffectSet::new(&host, 3).unwrap();
    let mut applied = AppliedState::default();
    push_configuration(&mut backend, ChangeFlags::ALL, &config, &mut applied);
    group.bench_function("full_warm", |b| {
        b.iter(|| push_configuration(&mut backend, ChangeFlags::ALL, black_box(&config), &mut applied))
    });

    group.finish();
}

criterion_group!(benches, benchmark_planning, benchmark_push);
criterion_main!(benches);
