use opsim_game::rng::{CountingRng, SeededSource};
use opsim_game::{DifficultyConfig, SystemState, advance};

const SAMPLE_SIZE: usize = 5000;
const TOLERANCE: f64 = 0.025;

fn rate(hits: usize) -> f64 {
    let total = f64::from(u32::try_from(SAMPLE_SIZE).expect("sample size fits u32"));
    f64::from(u32::try_from(hits).expect("count fits")) / total
}

/// From the safe state a spike moves the generator by a full spike amount,
/// which no nudge can reach.
fn spike_rate(elapsed_secs: u32, seed: u64) -> (f64, f64) {
    let cfg = DifficultyConfig::default();
    let multiplier = cfg.multiplier(cfg.phase_at(elapsed_secs));
    let mut rng: SeededSource = CountingRng::new(seed);
    let mut spikes = 0usize;
    let mut toward_fault = 0usize;
    for _ in 0..SAMPLE_SIZE {
        let next = advance(&SystemState::SAFE, elapsed_secs, &cfg, &mut rng);
        let delta = next.generator - SystemState::SAFE.generator;
        if delta.abs() > 5.0 * multiplier + 1e-9 {
            spikes += 1;
            if delta > 0.0 {
                toward_fault += 1;
            }
        }
    }
    let spike_share = rate(spikes);
    let fault_share = f64::from(u32::try_from(toward_fault).expect("count fits"))
        / f64::from(u32::try_from(spikes.max(1)).expect("count fits"));
    (spike_share, fault_share)
}

#[test]
fn early_phase_spikes_at_base_rate() {
    let (spikes, toward_fault) = spike_rate(30, 0xACED);
    assert!(
        (spikes - 0.10).abs() <= TOLERANCE,
        "early spike rate drifted: observed {spikes:.4}"
    );
    assert!(
        (toward_fault - 0.5).abs() <= 0.1,
        "spike target odds drifted: observed {toward_fault:.4}"
    );
}

#[test]
fn later_phases_spike_more_often() {
    let (middle, _) = spike_rate(200, 0xBEEF);
    let (late, _) = spike_rate(400, 0xF00D);
    assert!((middle - 0.15).abs() <= TOLERANCE, "middle rate {middle:.4}");
    assert!((late - 0.20).abs() <= TOLERANCE, "late rate {late:.4}");
}

#[test]
fn nudges_are_centred_and_bounded() {
    let cfg = DifficultyConfig::default();
    let mut rng: SeededSource = CountingRng::new(1234);
    let mut sum = 0.0;
    for _ in 0..SAMPLE_SIZE {
        let next = advance(&SystemState::SAFE, 400, &cfg, &mut rng);
        let delta = next.stabilizer_top - SystemState::SAFE.stabilizer_top;
        assert!(delta.abs() <= 12.0, "late stabilizer nudge {delta} exceeds 6 x 2.0");
        sum += delta;
    }
    let mean = sum / f64::from(u32::try_from(SAMPLE_SIZE).expect("sample size fits u32"));
    assert!(mean.abs() < 0.5, "stabilizer drift is biased: mean {mean:.4}");
    // One spike roll plus one draw per gauge, spiking or not.
    assert_eq!(rng.draws(), 7 * u64::try_from(SAMPLE_SIZE).expect("fits"));
}
