pub mod playback;
pub mod processing;
pub mod wav;

pub use playback::{AudioPlayer, CpalPlayer};
