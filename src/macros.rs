/**
 Reads a field of a `libc::dirent` through a raw pointer.

 # Safety
 - The caller must ensure that the pointer is valid and points to a `dirent`.

 # Field Aliases
 - `d_type` is missing entirely on some systems, the macro then reports `DT_UNKNOWN`
   (see `build.rs`, which sets the `has_d_type` cfg)
*/
macro_rules! access_dirent {
    ($entry_ptr:expr, d_name) => {{
        // d_name is not guaranteed to really be [c_char; 256], never read it by value
        (&raw const (*$entry_ptr).d_name).cast::<libc::c_char>()
    }};

    ($entry_ptr:expr, d_type) => {{
        #[cfg(has_d_type)]
        {
            (*$entry_ptr).d_type
        }
        #[cfg(not(has_d_type))]
        {
            libc::DT_UNKNOWN
        }
    }};
}

/// Reads `stat` fields whose names or widths differ between platforms
macro_rules! access_stat {
    ($stat_struct:expr, st_mtimensec) => {{
        #[cfg(target_os = "netbsd")]
        {
            $stat_struct.st_mtimensec as _
        }

        #[cfg(not(target_os = "netbsd"))]
        {
            $stat_struct.st_mtime_nsec as _
        }
    }};

    ($stat_struct:expr, st_atimensec) => {{
        #[cfg(target_os = "netbsd")]
        {
            $stat_struct.st_atimensec as _
        }

        #[cfg(not(target_os = "netbsd"))]
        {
            $stat_struct.st_atime_nsec as _
        }
    }};

    // Birth time where the platform records one, status change time otherwise
    ($stat_struct:expr, st_birthtime) => {{
        #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
        {
            $stat_struct.st_birthtime as _
        }

        #[cfg(not(any(target_os = "macos", target_os = "ios", target_os = "freebsd")))]
        {
            $stat_struct.st_ctime as _
        }
    }};

    ($stat_struct:expr, st_birthtimensec) => {{
        #[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
        {
            $stat_struct.st_birthtime_nsec as _
        }

        #[cfg(target_os = "netbsd")]
        {
            $stat_struct.st_ctimensec as _
        }

        #[cfg(not(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "netbsd"
        )))]
        {
            $stat_struct.st_ctime_nsec as _
        }
    }};

    ($stat_struct:expr, st_ino) => {{ $stat_struct.st_ino as u64 }};

    ($stat_struct:expr, st_dev) => {{ $stat_struct.st_dev as u64 }};

    ($stat_struct:expr, $field:ident) => {{ $stat_struct.$field as _ }};
}

/**
 A compile time assert, mirroring `static_assert` from C++

 ```ignore
 const_assert!(size_of::<u32>() >= 4, "u32 must be 4 bytes!");
 ```
*/
macro_rules! const_assert {
    ($cond:expr $(,)?) => {
        const _: () = {
            if !$cond {
                panic!(concat!("const assertion failed: ", stringify!($cond)));
            }
        };
    };
    ($cond:expr, $($arg:tt)+) => {
        const _: () = {
            if !$cond {
                panic!($($arg)+);
            }
        };
    };
}

/// Calls `stat`/`lstat` on a NUL terminated path pointer, yielding `io::Result<libc::stat>`
macro_rules! stat_syscall {
    ($syscall:ident, $path_ptr:expr) => {{
        let mut stat_buf = core::mem::MaybeUninit::<libc::stat>::uninit();
        // SAFETY: the path pointer comes from a CStr, so it is NUL terminated
        let res = unsafe { libc::$syscall($path_ptr, stat_buf.as_mut_ptr()) };

        if res == 0 {
            // SAFETY: a zero return means the kernel filled the buffer
            Ok(unsafe { stat_buf.assume_init() })
        } else {
            Err(std::io::Error::last_os_error())
        }
    }};
}
