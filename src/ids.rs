/// Monotonic id source owned by the ledger. Ids start at 1 and are never
/// handed out twice, even after the entity holding one is removed.
#[derive(Debug)]
pub struct IdAllocator {
    next: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    /// Builds a value with the next id. The id is consumed only when
    /// `build` succeeds.
    pub fn allocate_with<T, E>(&mut self, build: impl FnOnce(u32) -> Result<T, E>) -> Result<T, E> {
        let value = build(self.next)?;
        self.next += 1;
        Ok(value)
    }
}
