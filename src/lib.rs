pub mod app;
pub mod config;
pub mod input;
pub mod model;
pub mod playback;
pub mod score;
pub mod session;
pub mod timeline;
pub mod timer;
pub mod traits;
pub mod util;
