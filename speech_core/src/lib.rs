//! Speech for the companion: the text-to-speech provider client used by the
//! server, the speak client and scoped playback used by the front end, and
//! the optional speech input capability.

mod elevenlabs;
mod error;
mod input;
mod playback;
mod speak;

pub use elevenlabs::{ElevenLabsClient, VoiceSettings, DEFAULT_BASE_URL, DEFAULT_VOICE_ID};
pub use error::SpeechError;
pub use input::{CommandRecognizer, Recognizer, SpeechInputProvider, DEFAULT_LANGUAGE};
pub use playback::{AudioPlayer, CommandPlayer, NullPlayer, PlaybackResource};
pub use speak::{SpeakClient, Speaker, VoiceOutput};
