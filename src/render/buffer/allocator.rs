//! GPU buffer allocation and ownership
//!
//! Every buffer the streamer creates is a [`GpuBuffer`] that releases its
//! storage when dropped. Allocations are accounted in an
//! [`AllocationLedger`], which can also refuse requests over a byte budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use wgpu::util::DeviceExt;

use crate::core::error::Error;
use crate::core::types::Result;

/// What a buffer will be bound as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

impl BufferUsage {
    fn wgpu_usages(self) -> wgpu::BufferUsages {
        match self {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        }
    }
}

const NO_BUDGET: u64 = u64::MAX;

/// Live allocation accounting shared by an allocator and every buffer it
/// created.
#[derive(Debug)]
pub struct AllocationLedger {
    live_buffers: AtomicUsize,
    live_bytes: AtomicU64,
    total_allocations: AtomicU64,
    total_releases: AtomicU64,
    budget_bytes: AtomicU64,
}

impl AllocationLedger {
    /// Create a ledger without a byte budget
    pub fn new() -> Self {
        Self {
            live_buffers: AtomicUsize::new(0),
            live_bytes: AtomicU64::new(0),
            total_allocations: AtomicU64::new(0),
            total_releases: AtomicU64::new(0),
            budget_bytes: AtomicU64::new(NO_BUDGET),
        }
    }

    /// Create a ledger refusing allocations beyond `bytes` live bytes
    pub fn with_budget(bytes: u64) -> Self {
        let ledger = Self::new();
        ledger.set_budget(Some(bytes));
        ledger
    }

    /// Change the byte budget. `None` removes it.
    pub fn set_budget(&self, bytes: Option<u64>) {
        self.budget_bytes.store(bytes.unwrap_or(NO_BUDGET), Ordering::SeqCst);
    }

    /// Current byte budget, if any
    pub fn budget(&self) -> Option<u64> {
        match self.budget_bytes.load(Ordering::SeqCst) {
            NO_BUDGET => None,
            bytes => Some(bytes),
        }
    }

    /// Reserve `bytes` for a new buffer, or fail with `GpuOutOfMemory`
    pub fn reserve(&self, bytes: u64) -> Result<()> {
        let budget = self.budget_bytes.load(Ordering::SeqCst);
        self.live_bytes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                let next = live.checked_add(bytes)?;
                (next <= budget).then_some(next)
            })
            .map_err(|live| Error::GpuOutOfMemory {
                requested: bytes,
                available: budget.saturating_sub(live),
            })?;

        self.live_buffers.fetch_add(1, Ordering::SeqCst);
        self.total_allocations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Return a reservation made by [`reserve`](Self::reserve)
    pub fn release(&self, bytes: u64) {
        self.live_bytes.fetch_sub(bytes, Ordering::SeqCst);
        self.live_buffers.fetch_sub(1, Ordering::SeqCst);
        self.total_releases.fetch_add(1, Ordering::SeqCst);
    }

    /// Buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::SeqCst)
    }

    /// Bytes currently alive
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Buffers ever created
    pub fn total_allocations(&self) -> u64 {
        self.total_allocations.load(Ordering::SeqCst)
    }

    /// Buffers ever released
    pub fn total_releases(&self) -> u64 {
        self.total_releases.load(Ordering::SeqCst)
    }
}

impl Default for AllocationLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage behind a [`GpuBuffer`]
#[derive(Debug)]
enum Backing {
    Device(wgpu::Buffer),
    Host(Box<[u8]>),
}

/// Exclusively owned GPU buffer, released on drop
#[derive(Debug)]
pub struct GpuBuffer {
    backing: Backing,
    size: u64,
    usage: BufferUsage,
    ledger: Arc<AllocationLedger>,
}

impl GpuBuffer {
    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Underlying wgpu buffer, when device backed
    pub fn raw(&self) -> Option<&wgpu::Buffer> {
        match &self.backing {
            Backing::Device(buffer) => Some(buffer),
            Backing::Host(_) => None,
        }
    }

    /// Contents, when host backed
    pub fn host_bytes(&self) -> Option<&[u8]> {
        match &self.backing {
            Backing::Device(_) => None,
            Backing::Host(bytes) => Some(bytes),
        }
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        if let Backing::Device(buffer) = &self.backing {
            buffer.destroy();
        }
        self.ledger.release(self.size);
    }
}

/// Creates GPU buffers. Implementations may refuse with an error.
pub trait BufferAllocator: Send + Sync {
    /// Create a buffer initialised with `contents`
    fn create_buffer(&self, label: &str, usage: BufferUsage, contents: &[u8]) -> Result<GpuBuffer>;

    /// Ledger tracking this allocator's live buffers
    fn ledger(&self) -> &Arc<AllocationLedger>;
}

/// Allocator backed by a wgpu device
pub struct DeviceAllocator {
    device: wgpu::Device,
    ledger: Arc<AllocationLedger>,
}

impl DeviceAllocator {
    pub fn new(device: wgpu::Device) -> Self {
        Self::with_ledger(device, Arc::new(AllocationLedger::new()))
    }

    pub fn with_ledger(device: wgpu::Device, ledger: Arc<AllocationLedger>) -> Self {
        Self { device, ledger }
    }
}

impl BufferAllocator for DeviceAllocator {
    fn create_buffer(&self, label: &str, usage: BufferUsage, contents: &[u8]) -> Result<GpuBuffer> {
        let size = contents.len() as u64;
        let max = self.device.limits().max_buffer_size;
        if size > max {
            return Err(Error::GpuOutOfMemory {
                requested: size,
                available: max,
            });
        }

        self.ledger.reserve(size)?;
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage: usage.wgpu_usages(),
        });

        Ok(GpuBuffer {
            backing: Backing::Device(buffer),
            size,
            usage,
            ledger: Arc::clone(&self.ledger),
        })
    }

    fn ledger(&self) -> &Arc<AllocationLedger> {
        &self.ledger
    }
}

/// Allocator keeping buffers in host memory. Used by tests, benchmarks and
/// the headless flight tool.
#[derive(Default)]
pub struct HeadlessAllocator {
    ledger: Arc<AllocationLedger>,
}

impl HeadlessAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator refusing allocations beyond `bytes` live bytes
    pub fn with_budget(bytes: u64) -> Self {
        Self {
            ledger: Arc::new(AllocationLedger::with_budget(bytes)),
        }
    }
}

impl BufferAllocator for HeadlessAllocator {
    fn create_buffer(&self, _label: &str, usage: BufferUsage, contents: &[u8]) -> Result<GpuBuffer> {
        let size = contents.len() as u64;
        self.ledger.reserve(size)?;
        Ok(GpuBuffer {
            backing: Backing::Host(contents.into()),
            size,
            usage,
            ledger: Arc::clone(&self.ledger),
        })
    }

    fn ledger(&self) -> &Arc<AllocationLedger> {
        &self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_buffer_released_on_drop() {
        let allocator = HeadlessAllocator::new();
        let buffer = allocator
            .create_buffer("test", BufferUsage::Vertex, &[1, 2, 3, 4])
            .unwrap();
        assert_eq!(buffer.size(), 4);
        assert_eq!(buffer.host_bytes(), Some(&[1u8, 2, 3, 4][..]));
        assert!(buffer.raw().is_none());
        assert_eq!(allocator.ledger().live_buffers(), 1);
        assert_eq!(allocator.ledger().live_bytes(), 4);

        drop(buffer);
        assert_eq!(allocator.ledger().live_buffers(), 0);
        assert_eq!(allocator.ledger().live_bytes(), 0);
        assert_eq!(allocator.ledger().total_releases(), 1);
    }

    #[test]
    fn test_budget_refuses_allocation() {
        let allocator = HeadlessAllocator::with_budget(10);
        let _a = allocator.create_buffer("a", BufferUsage::Index, &[0; 8]).unwrap();

        let err = allocator
            .create_buffer("b", BufferUsage::Index, &[0; 8])
            .unwrap_err();
        match err {
            Error::GpuOutOfMemory { requested, available } => {
                assert_eq!(requested, 8);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(allocator.ledger().live_buffers(), 1);
    }

    #[test]
    fn test_raising_budget_allows_retry() {
        let allocator = HeadlessAllocator::with_budget(0);
        assert!(allocator.create_buffer("a", BufferUsage::Vertex, &[0; 4]).is_err());

        allocator.ledger().set_budget(None);
        assert_eq!(allocator.ledger().budget(), None);
        assert!(allocator.create_buffer("a", BufferUsage::Vertex, &[0; 4]).is_ok());
    }
}
