/// Per-namespace request ids.
///
/// Each counter hands out its current value and then advances, wrapping
/// at `u32::MAX`. Ids are never reused within a session short of a wrap.
#[derive(Debug, Default, Clone)]
pub struct RequestSequencer {
    receiver: u32,
    media: u32,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id for the receiver-control namespace.
    pub fn next_receiver_id(&mut self) -> u32 {
        let id = self.receiver;
        self.receiver = self.receiver.wrapping_add(1);
        id
    }

    /// Next id for the media-control namespace.
    pub fn next_media_id(&mut self) -> u32 {
        let id = self.media;
        self.media = self.media.wrapping_add(1);
        id
    }
}
