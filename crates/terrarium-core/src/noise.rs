//! Seeded terrain noise used to shape the island.

use fastnoise_lite::{FastNoiseLite, NoiseType};

/// Two-channel value-noise field: a coarse "continent" channel and a fine
/// "detail" channel, blended `(big + 2·small) / 3` and normalized to
/// `[0, 1]`. Deterministic per seed.
pub struct NoiseField {
    continent: FastNoiseLite,
    detail: FastNoiseLite,
}

impl NoiseField {
    const CONTINENT_FREQUENCY: f32 = 0.09;
    const DETAIL_FREQUENCY: f32 = 0.23;

    #[must_use]
    pub fn new(seed: i32) -> Self {
        let mut continent = FastNoiseLite::with_seed(seed);
        continent.set_noise_type(Some(NoiseType::Value));
        continent.set_frequency(Some(Self::CONTINENT_FREQUENCY));

        let mut detail = FastNoiseLite::with_seed(seed.wrapping_add(1));
        detail.set_noise_type(Some(NoiseType::Value));
        detail.set_frequency(Some(Self::DETAIL_FREQUENCY));

        Self { continent, detail }
    }

    /// Blended island field at grid coordinates, in `[0, 1]`.
    #[must_use]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let big = normalize(self.continent.get_noise_2d(x, y));
        let small = normalize(self.detail.get_noise_2d(x, y));
        ((big + 2.0 * small) / 3.0).clamp(0.0, 1.0)
    }
}

/// Map raw `[-1, 1]` noise onto `[0, 1]`.
fn normalize(raw: f32) -> f32 {
    (raw + 1.0) * 0.5
}
