//! Injectable randomness for the simulator and scripted operators.
use hmac::{Hmac, Mac};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use sha2::Sha256;
use std::cell::{RefCell, RefMut};
use std::rc::Rc;

/// Source of uniform draws in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform draw in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// True with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.uniform() < probability
    }

    /// Uniform draw in `[min, max)`.
    fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.uniform() * (max - min)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    /// Seeded stream backed by `SmallRng`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Count draws on an existing generator.
    #[must_use]
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl<R: RngCore> RandomSource for CountingRng<R> {
    fn uniform(&mut self) -> f64 {
        self.gen_range(0.0..1.0)
    }
}

/// Default seeded source used by sessions.
pub type SeededSource = CountingRng<SmallRng>;

/// Named streams carved out of one user seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Gauge nudges and spikes.
    Simulator,
    /// Scripted operator jitter in the tester.
    Operator,
}

impl Stream {
    const fn domain_tag(self) -> &'static [u8] {
        match self {
            Self::Simulator => b"simulator",
            Self::Operator => b"operator",
        }
    }
}

/// Deterministic bundle of RNG streams segregated by simulation domain.
#[derive(Debug, Clone)]
pub struct RngBundle {
    simulator: RefCell<SeededSource>,
    operator: RefCell<SeededSource>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            simulator: RefCell::new(CountingRng::new(derive_stream_seed(
                seed,
                Stream::Simulator.domain_tag(),
            ))),
            operator: RefCell::new(CountingRng::new(derive_stream_seed(
                seed,
                Stream::Operator.domain_tag(),
            ))),
        }
    }

    /// Access the simulator stream.
    #[must_use]
    pub fn simulator(&self) -> RefMut<'_, SeededSource> {
        self.simulator.borrow_mut()
    }

    /// Access the operator stream.
    #[must_use]
    pub fn operator(&self) -> RefMut<'_, SeededSource> {
        self.operator.borrow_mut()
    }

    /// Owned handle onto one stream of a shared bundle.
    #[must_use]
    pub fn handle(bundle: &Rc<Self>, stream: Stream) -> StreamHandle {
        StreamHandle {
            bundle: Rc::clone(bundle),
            stream,
        }
    }
}

/// A [`RandomSource`] that draws from one stream of a shared [`RngBundle`].
#[derive(Debug, Clone)]
pub struct StreamHandle {
    bundle: Rc<RngBundle>,
    stream: Stream,
}

impl StreamHandle {
    /// Draws performed so far on the underlying stream.
    #[must_use]
    pub fn draws(&self) -> u64 {
        match self.stream {
            Stream::Simulator => self.bundle.simulator().draws(),
            Stream::Operator => self.bundle.operator().draws(),
        }
    }
}

impl RandomSource for StreamHandle {
    fn uniform(&mut self) -> f64 {
        match self.stream {
            Stream::Simulator => self.bundle.simulator().uniform(),
            Stream::Operator => self.bundle.operator().uniform(),
        }
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceSource {
    /// Values are clamped into `[0, 1)` so the trait contract holds.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0 - f64::EPSILON) })
            .collect();
        Self { values, cursor: 0 }
    }

    /// Source that always returns the same draw.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }

    /// Number of draws served so far.
    #[must_use]
    pub const fn served(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceSource {
    fn uniform(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}
