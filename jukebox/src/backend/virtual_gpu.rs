use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::display::Resolution;
use crate::playback::producers::RenderContext;
use crate::render::{
    BufferId, GpuSurface, PlaneLayout, ScanoutBuffer, SurfaceError,
};

// XRGB8888
const FOURCC_XRGB8888: u32 = 0x3432_5258;

#[derive(Debug)]
struct Pool {
    size: usize,
    leased: Vec<u64>,
    next: u64,
    fail_next: u32,
    max_leased: usize,
}

/// A rotating pool of fake scanout buffers. Buffer ids cycle through
/// `1..=pool_size` the way a swapchain reuses its images.
#[derive(Clone, Debug)]
pub struct VirtualGpu {
    resolution: Resolution,
    pool: Rc<RefCell<Pool>>,
}

impl VirtualGpu {
    pub fn new(resolution: Resolution, pool_size: usize) -> Self {
        Self {
            resolution,
            pool: Rc::new(RefCell::new(Pool {
                size: pool_size.max(1),
                leased: Vec::new(),
                next: 0,
                fail_next: 0,
                max_leased: 0,
            })),
        }
    }

    /// Makes the next `count` locks fail as if GPU memory were exhausted.
    pub fn fail_next_locks(&mut self, count: u32) {
        self.pool.borrow_mut().fail_next = count;
    }

    pub fn leased(&self) -> usize {
        self.pool.borrow().leased.len()
    }

    /// High-water mark of simultaneously leased buffers.
    pub fn max_leased(&self) -> usize {
        self.pool.borrow().max_leased
    }
}

impl GpuSurface for VirtualGpu {
    type Buffer = VirtualBuffer;

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn lock_front_buffer(&mut self) -> Result<VirtualBuffer, SurfaceError> {
        let mut pool = self.pool.borrow_mut();

        if pool.fail_next > 0 {
            pool.fail_next -= 1;
            return Err(SurfaceError::Exhausted);
        }
        if pool.leased.len() >= pool.size {
            return Err(SurfaceError::Exhausted);
        }

        let size = pool.size as u64;
        let mut id = pool.next % size + 1;
        while pool.leased.contains(&id) {
            id = id % size + 1;
        }
        pool.next = id;
        pool.leased.push(id);
        pool.max_leased = pool.max_leased.max(pool.leased.len());

        Ok(VirtualBuffer {
            id,
            resolution: self.resolution,
            pool: self.pool.clone(),
        })
    }
}

#[derive(Debug)]
pub struct VirtualBuffer {
    id: u64,
    resolution: Resolution,
    pool: Rc<RefCell<Pool>>,
}

impl ScanoutBuffer for VirtualBuffer {
    fn id(&self) -> BufferId {
        BufferId(self.id)
    }

    fn layout(&self) -> PlaneLayout {
        let pitch = self.resolution.width * 4;
        PlaneLayout {
            width: self.resolution.width,
            height: self.resolution.height,
            fourcc: FOURCC_XRGB8888,
            modifier: None,
            handles: [self.id as u32, 0, 0, 0],
            pitches: [pitch, 0, 0, 0],
            offsets: [0; 4],
            depth: 24,
            bpp: 32,
        }
    }
}

impl Drop for VirtualBuffer {
    fn drop(&mut self) {
        self.pool.borrow_mut().leased.retain(|id| *id != self.id);
    }
}

/// Counts what a real render context would do.
#[derive(Debug, Default)]
pub struct VirtualRenderContext {
    pub current: bool,
    pub swaps: u64,
    pub black_clears: u64,
    pub fail_make_current: bool,
}

impl RenderContext for VirtualRenderContext {
    fn make_current(&mut self) -> Result<(), String> {
        if self.fail_make_current {
            return Err("context lost".to_string());
        }
        self.current = true;
        debug!("virtual render context made current");
        Ok(())
    }

    fn clear_black(&mut self) {
        self.black_clears += 1;
    }

    fn swap_buffers(&mut self) -> Result<(), String> {
        if !self.current {
            return Err("render context not current".to_string());
        }
        self.swaps += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_rotate_and_return_on_drop() {
        let mut gpu = VirtualGpu::new(Resolution::new(64, 48), 2);

        let a = gpu.lock_front_buffer().unwrap();
        let b = gpu.lock_front_buffer().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(matches!(
            gpu.lock_front_buffer(),
            Err(SurfaceError::Exhausted)
        ));

        drop(a);
        assert_eq!(gpu.leased(), 1);
        assert!(gpu.lock_front_buffer().is_ok());
        assert_eq!(gpu.max_leased(), 2);
    }
}
