//! Bump allocator for entry payload bytes (§4.A).
//!
//! Entries in the hash table never own heap memory individually —
//! their key and (for STRING/BINARY) value bytes are bump-allocated
//! out of a small number of fixed-size blocks here and referenced by
//! handle. There is no per-allocation free; `reset`/`clear` reclaim
//! everything at once, `destroy` drops every block. This file has no
//! `unsafe` in it: handles are (block, offset, len) triples rather
//! than raw pointers, so the borrow checker enforces that arena bytes
//! never outlive the arena.

/// Default block size: 64 KiB, per §4.A.
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// Bump-allocation alignment, per §4.A. Since blocks are plain
/// `Vec<u8>` byte buffers rather than raw memory, alignment only
/// matters for keeping multi-byte scalar fields tidy; it costs
/// nothing to honor it.
const ALIGN: usize = 8;

fn align_up(n: usize) -> usize {
    (n + ALIGN - 1) & !(ALIGN - 1)
}

struct Block {
    data: Vec<u8>,
    used: usize,
}

impl Block {
    fn with_capacity(cap: usize) -> Self {
        Block {
            data: vec![0u8; cap],
            used: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.used
    }
}

/// A handle to bytes living inside an [`Arena`]. Meaningless without
/// the arena that produced it — dereferencing wrong-arena handles is
/// a caller bug, not a memory-safety hazard, since [`Arena::get`]
/// bounds-checks every access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaBytes {
    block: u32,
    offset: u32,
    len: u32,
}

impl ArenaBytes {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bump allocator: a list of fixed-size blocks, serving allocations
/// from the current block until it's exhausted, then opening a new
/// one. Oversize allocations (bigger than the block size) get a
/// dedicated block of their own, matching §4.A's block policy.
pub struct Arena {
    blocks: Vec<Block>,
    current: usize,
    block_size: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Arena {
            blocks: vec![Block::with_capacity(block_size)],
            current: 0,
            block_size,
        }
    }

    /// Bump-allocate `bytes` into the arena, returning a handle.
    /// Cannot fail in practice (the underlying allocator is the
    /// system allocator via `Vec`), but returns `None` to preserve
    /// the `alloc(n) -> ptr | OOM` contract from §4.A for callers
    /// that want to treat allocation failure as a recoverable error
    /// rather than aborting.
    pub fn alloc(&mut self, bytes: &[u8]) -> Option<ArenaBytes> {
        let n = bytes.len();
        if self.blocks[self.current].remaining() < n {
            let new_block_size = align_up(n).max(self.block_size);
            self.blocks.push(Block::with_capacity(new_block_size));
            self.current = self.blocks.len() - 1;
        }

        let block = &mut self.blocks[self.current];
        let offset = block.used;
        block.data[offset..offset + n].copy_from_slice(bytes);
        block.used += n;
        // Bump to the next 8-byte-aligned offset for the *next*
        // allocation, without consuming bytes beyond what's needed
        // now (the padding just sits unused until reset/destroy).
        let padded = align_up(block.used).min(block.data.len());
        block.used = padded;

        Some(ArenaBytes {
            block: u32::try_from(self.current).ok()?,
            offset: u32::try_from(offset).ok()?,
            len: u32::try_from(n).ok()?,
        })
    }

    /// Resolve a handle to its bytes. Panics if the handle was not
    /// produced by this arena (or by an arena since reset/destroy) —
    /// that is a programming error at the call site, not a runtime
    /// condition a well-behaved caller can hit.
    pub fn get(&self, handle: ArenaBytes) -> &[u8] {
        let block = &self.blocks[handle.block as usize];
        let start = handle.offset as usize;
        let end = start + handle.len as usize;
        &block.data[start..end]
    }

    /// Mark every block's used region as free without releasing the
    /// backing memory — every block stays allocated, only `used`
    /// counters reset. Existing handles become dangling (callers must
    /// not retain them across a `reset`).
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.used = 0;
        }
        self.current = 0;
    }

    /// Release every block. Equivalent to dropping and recreating the
    /// arena; kept as an explicit operation to mirror §4.A's API.
    pub fn destroy(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::with_capacity(self.block_size));
        self.current = 0;
    }

    /// Total bytes currently in use across all blocks. Exposed for
    /// STATS reporting.
    pub fn bytes_in_use(&self) -> usize {
        self.blocks.iter().map(|b| b.used).sum()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}
