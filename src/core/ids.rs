// Monotonic id allocation for one collection; callers hold the store lock.

/// First id handed out after construction or reset.
pub const FIRST_ID: u64 = 1;

#[derive(Debug)]
pub struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next_id: FIRST_ID }
    }

    pub fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next_id = FIRST_ID;
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{FIRST_ID, IdAllocator};

    #[test]
    fn ids_increase_without_gaps() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next(), FIRST_ID);
        assert_eq!(ids.next(), FIRST_ID + 1);
        assert_eq!(ids.next(), FIRST_ID + 2);
    }

    #[test]
    fn reset_restarts_at_first_id() {
        let mut ids = IdAllocator::new();
        ids.next();
        ids.next();
        ids.reset();
        assert_eq!(ids.next(), FIRST_ID);
    }
}
