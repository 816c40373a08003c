//! Concrete collaborators. The `virtual_*` and `simulated` backends run the
//! whole engine in-process (development builds and tests); `kms` drives a
//! real display controller.

#[cfg(feature = "kms")]
pub mod kms;
pub mod simulated;
pub mod virtual_display;
pub mod virtual_gpu;
