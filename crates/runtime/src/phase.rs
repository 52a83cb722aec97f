/// Cyclic animation phase.
///
/// Purely presentational: it counts timer ticks modulo `modulus` and never
/// feeds back into hazard data.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AnimationPhase {
    value: u32,
    modulus: u32,
}

impl AnimationPhase {
    /// A phase starting at 0. A modulus of 0 is treated as 1.
    pub fn new(modulus: u32) -> Self {
        Self {
            value: 0,
            modulus: modulus.max(1),
        }
    }

    pub fn value(self) -> u32 {
        self.value
    }

    pub fn modulus(self) -> u32 {
        self.modulus
    }

    pub fn next(self) -> Self {
        Self {
            value: (self.value + 1) % self.modulus,
            modulus: self.modulus,
        }
    }

    /// `value * k`, the angle fed into the pulse curve.
    pub fn angle(self, k: f64) -> f64 {
        self.value as f64 * k
    }
}
