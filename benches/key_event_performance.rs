//! Key Event Performance Benchmarks
//!
//! The path from a key event to a sounding decision runs on the input thread
//! and must stay far below one frame of input latency:
//!
//! ```text
//! key event ─▶ KeyboardState::apply ─▶ resolve ─▶ envelope scheduling
//! ```
//!
//! Rendering is benchmarked separately at common block sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use keygate::prelude::*;

const BLOCK_SIZES: [usize; 4] = [64, 128, 256, 512];

// ============================================================================
// Helper Functions
// ============================================================================

fn k(c: char) -> KeyId {
    KeyId::new(c)
}

/// Keyboard with the gate and the given selector keys held
fn held(layout: &KeyLayout, keys: &[char]) -> KeyboardState {
    keys.iter()
        .enumerate()
        .fold(KeyboardState::new(), |state, (i, &c)| {
            state.apply(k(c), KeyAction::Press, i as u64, layout)
        })
}

// ============================================================================
// Decision Benchmarks
// ============================================================================

fn bench_keyboard_apply(c: &mut Criterion) {
    let layout = SessionConfig::binary_keyboard().layout;
    let state = held(&layout, &['j', 'a', 's']);

    c.bench_function("keyboard/apply_press_release", |b| {
        b.iter(|| {
            let pressed = state.apply(black_box(k('d')), KeyAction::Press, 10, &layout);
            pressed.apply(k('d'), KeyAction::Release, 20, &layout)
        })
    });
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolver");

    let composite = SessionConfig::binary_keyboard();
    let resolver = composite.resolver_config().unwrap();
    let all_bits = held(&composite.layout, &['j', 'a', 's', 'd', 'f', ' ']);
    group.bench_function("composite", |b| {
        b.iter(|| resolve(black_box(&all_bits), &resolver))
    });

    let direct = SessionConfig::direct_keyboard();
    let resolver = direct.resolver_config().unwrap();
    let many = held(&direct.layout, &['j', 'a', 's', 'd', 'f', 'z', 'x', 'c', 'v']);
    group.bench_function("direct_eight_held", |b| {
        b.iter(|| resolve(black_box(&many), &resolver))
    });

    group.finish();
}

// ============================================================================
// Session Benchmarks
// ============================================================================

fn bench_session_phrase(c: &mut Criterion) {
    let clock = ManualClock::new();
    let backend = VirtualBackend::new(clock.clone());
    let mut session = Session::new(backend, &SessionConfig::binary_keyboard()).unwrap();
    let mut t = 0u64;

    c.bench_function("session/gate_select_release", |b| {
        b.iter(|| {
            for (key, action) in [
                ('j', KeyAction::Press),
                ('a', KeyAction::Press),
                ('s', KeyAction::Press),
                ('a', KeyAction::Release),
                ('j', KeyAction::Release),
                ('s', KeyAction::Release),
            ] {
                t += 10;
                let _ = black_box(session.on_key_event(k(key), action, t));
            }
            clock.advance(2.0);
            session.poll().len()
        })
    });
}

// ============================================================================
// Rendering Benchmarks
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for block_size in BLOCK_SIZES {
        group.throughput(Throughput::Elements(block_size as u64));
        group.bench_with_input(
            BenchmarkId::new("virtual_tone", block_size),
            &block_size,
            |b, &size| {
                let clock = ManualClock::new();
                let mut backend = VirtualBackend::new(clock.clone());
                let mut envelope = EnvelopeController::new(backend.create_tone(440.0).unwrap());
                envelope.start(&EnvelopeConfig::default(), None);
                let mut block = vec![0.0f32; size];

                b.iter(|| {
                    envelope.tone_mut().render(black_box(&mut block), 48000.0);
                    block[size - 1]
                });
            },
        );
    }

    group.finish();
}

criterion_group!(decision_benches, bench_keyboard_apply, bench_resolve);
criterion_group!(session_benches, bench_session_phrase, bench_render);
criterion_main!(decision_benches, session_benches);
