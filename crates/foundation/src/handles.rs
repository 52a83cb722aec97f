/// Generational handle into an [`Arena`](crate::arena::Arena).
///
/// The generation is bumped every time a slot is reused, so a handle that
/// outlives its value never resolves to the slot's next occupant.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32, u32); // (index, generation)

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn generation(self) -> u32 {
        self.1
    }
}

#[cfg(test)]
mod tests {
    use super::Handle;

    #[test]
    fn accessors_round_trip_fields() {
        let h = Handle::new(7, 3);
        assert_eq!(h.index(), 7);
        assert_eq!(h.generation(), 3);
        assert_ne!(h, Handle::new(7, 4));
    }
}
