pub mod app;
pub mod events;
pub mod frame_clock;
pub mod launcher;
pub mod settings;
pub mod settings_watch;
pub mod storage;
