use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("backing store rejected the write")]
    WriteRejected,
}

/// A byte region that holds exactly one settings block.
///
/// Implementations must make `write` all-or-nothing: after a failed write
/// the previous block (if any) is still what `read` returns.
pub trait BlockStore {
    /// `Ok(None)` when nothing has ever been written or the region was wiped.
    fn read(&mut self) -> Result<Option<Vec<u8>>, StoreError>;
    fn write(&mut self, block: &[u8]) -> Result<(), StoreError>;
    fn wipe(&mut self) -> Result<(), StoreError>;
}

/// In-memory store with fault injection, used by tests and simulations.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    block: Option<Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
    wipes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(block: Vec<u8>) -> Self {
        Self {
            block: Some(block),
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<&[u8]> {
        self.block.as_deref()
    }

    /// Flips every bit of one stored byte. No-op when empty or out of range.
    pub fn corrupt_byte(&mut self, index: usize) {
        if let Some(byte) = self.block.as_mut().and_then(|block| block.get_mut(index)) {
            *byte = !*byte;
        }
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn wipe_count(&self) -> usize {
        self.wipes
    }
}

impl BlockStore for MemoryStore {
    fn read(&mut self) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Io(std::io::Error::other("injected read failure")));
        }
        Ok(self.block.clone())
    }

    fn write(&mut self, block: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteRejected);
        }
        self.block = Some(block.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn wipe(&mut self) -> Result<(), StoreError> {
        self.block = None;
        self.wipes += 1;
        Ok(())
    }
}
