//! MPEG 音频 (MPEG-1/2/2.5 Layer I/II/III).

pub mod backend;
pub mod header;
pub mod parser;
pub mod scanner;
pub mod settings;
pub mod vbr;

pub use backend::{FrameDecoder, SilenceDecoder};
#[cfg(feature = "symphonia-backend")]
pub use backend::SymphoniaDecoder;
pub use header::{ChannelMode, FrameHeader, MpegVersion};
pub use parser::{MEDIA_TYPE, MpegAudioDecoder};
pub use scanner::{FrameScanner, ScanResult, SyncState};
pub use settings::MpegAudioSettings;
pub use vbr::{LameTag, VbrInfo, VbrKind};
