// Abstract over system memory allocation functions

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct AllocFailed;

impl std::error::Error for AllocFailed {}

use std::fmt;
impl fmt::Display for AllocFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Alloc failed")
    }
}

/// Ask the operating system for `size` contiguous bytes. `size` must be non-zero.
pub fn sys_alloc(size: usize) -> Result<*mut u8, AllocFailed> {
    debug_assert!(size > 0);

    vendor::sys_alloc(size)
}

/// Give back a region obtained from `sys_alloc()` with the same `size`.
pub fn sys_dealloc(ptr: *mut u8, size: usize) {
    debug_assert!(!ptr.is_null());
    debug_assert!(size > 0);

    vendor::sys_dealloc(ptr, size)
}

#[cfg(target_os = "linux")]
pub mod vendor {
    use crate::platformalloc::AllocFailed;
    use rustix::mm::{MapFlags, ProtFlags, mmap_anonymous, munmap};
    use std::ffi::c_void;
    use std::ptr;

    // No MapFlags::NORESERVE: the mapping is charged against the kernel's overcommit accounting,
    // same as glibc's malloc does for large requests.
    pub fn sys_alloc(reqsize: usize) -> Result<*mut u8, AllocFailed> {
        match unsafe {
            mmap_anonymous(
                ptr::null_mut(),
                reqsize,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::PRIVATE,
            )
        } {
            Ok(p) => Ok(p as *mut u8),
            Err(_) => Err(AllocFailed),
        }
    }

    pub fn sys_dealloc(p: *mut u8, size: usize) {
        unsafe {
            munmap(p as *mut c_void, size).ok();
        }
    }
}

#[cfg(target_vendor = "apple")]
pub mod vendor {
    use crate::platformalloc::AllocFailed;
    use mach_sys::kern_return::KERN_SUCCESS;
    use mach_sys::port::mach_port_t;
    use mach_sys::traps::mach_task_self;
    use mach_sys::vm::{mach_vm_allocate, mach_vm_deallocate};
    use mach_sys::vm_statistics::VM_FLAGS_ANYWHERE;
    use mach_sys::vm_types::{mach_vm_address_t, mach_vm_size_t};

    pub fn sys_alloc(size: usize) -> Result<*mut u8, AllocFailed> {
        let task: mach_port_t = unsafe { mach_task_self() };
        let mut address: mach_vm_address_t = 0;
        let size: mach_vm_size_t = size as mach_vm_size_t;

        let retval;
        unsafe {
            retval = mach_vm_allocate(task, &mut address, size, VM_FLAGS_ANYWHERE);
        }
        if retval == KERN_SUCCESS {
            Ok(address as *mut u8)
        } else {
            Err(AllocFailed)
        }
    }

    pub fn sys_dealloc(p: *mut u8, size: usize) {
        unsafe {
            let retval = mach_vm_deallocate(mach_task_self(), p as mach_vm_address_t, size as mach_vm_size_t);
            debug_assert!(retval == KERN_SUCCESS);
        }
    }
}

#[cfg(not(any(target_os = "linux", target_vendor = "apple")))]
pub mod vendor {
    use crate::platformalloc::AllocFailed;
    use std::alloc::{GlobalAlloc, Layout, System};

    const PAGE_SIZE: usize = 4096;

    pub fn sys_alloc(size: usize) -> Result<*mut u8, AllocFailed> {
        let layout = Layout::from_size_align(size, PAGE_SIZE).map_err(|_| AllocFailed)?;
        let p = unsafe { System.alloc_zeroed(layout) };
        if p.is_null() {
            Err(AllocFailed)
        } else {
            Ok(p)
        }
    }

    pub fn sys_dealloc(p: *mut u8, size: usize) {
        // sys_alloc() already accepted this size with this alignment.
        if let Ok(layout) = Layout::from_size_align(size, PAGE_SIZE) {
            unsafe { System.dealloc(p, layout) };
        }
    }
}
