use super::CommandPlayer;

/// `afplay` ships with every macOS install and blocks until playback ends.
pub fn afplay_player() -> CommandPlayer {
    CommandPlayer::new("afplay", &[])
}
