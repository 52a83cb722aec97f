/// Identifies one layer selection.
///
/// Every asynchronous result is tagged with the generation it was started
/// under; results whose generation is no longer current are discarded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Monotonically increasing selection counter.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: u64,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self { current: 0 }
    }

    pub fn current(&self) -> Generation {
        Generation(self.current)
    }

    /// Starts a new generation, making every earlier one stale.
    pub fn advance(&mut self) -> Generation {
        self.current = self.current.wrapping_add(1);
        Generation(self.current)
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation.0 == self.current
    }
}

#[cfg(test)]
mod tests {
    use super::{Generation, GenerationCounter};

    #[test]
    fn advance_makes_previous_stale() {
        let mut c = GenerationCounter::new();
        let a = c.advance();
        assert!(c.is_current(a));
        let b = c.advance();
        assert!(b > a);
        assert!(!c.is_current(a));
        assert!(c.is_current(b));
        assert_eq!(c.current(), Generation(2));
    }
}
