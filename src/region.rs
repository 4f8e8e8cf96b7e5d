//! An owned, contiguous run of bytes obtained straight from the operating system.

use crate::platformalloc::{AllocFailed, sys_alloc, sys_dealloc};
use std::ptr::NonNull;

/// Contiguous bytes from `sys_alloc()`, handed back with `sys_dealloc()` when dropped.
///
/// A zero-length region never touches the operating system.
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
}

impl Region {
    /// Allocate `len` bytes. Sizes that do not fit in this host's address space fail the same way
    /// the operating system refusing them would.
    pub fn alloc(len: u64) -> Result<Self, AllocFailed> {
        let len = usize::try_from(len).map_err(|_| AllocFailed)?;
        if len == 0 {
            return Ok(Self { ptr: NonNull::dangling(), len });
        }

        let p = sys_alloc(len)?;
        let ptr = NonNull::new(p).ok_or(AllocFailed)?;
        Ok(Self { ptr, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Write a sentinel into the first and the last byte so that the operating system has to
    /// commit those pages rather than just reserve them.
    pub fn touch_ends(&mut self) {
        if self.len == 0 {
            return;
        }
        unsafe {
            self.ptr.as_ptr().write_volatile(42);
            self.ptr.as_ptr().add(self.len - 1).write_volatile(17);
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        // sys_alloc() hands out zero-filled memory, so every byte is initialized.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if self.len > 0 {
            sys_dealloc(self.ptr.as_ptr(), self.len);
        }
    }
}
