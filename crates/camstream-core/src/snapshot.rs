//! Single-frame snapshot responses.

/// Outcome of a snapshot request.
#[derive(Debug)]
pub enum Snapshot<F> {
    /// A captured JPEG, served as `200 image/jpeg` with its exact length.
    Jpeg(F),
    /// The driver returned no frame; served as `503` with an empty body.
    Unavailable,
}

impl<F: AsRef<[u8]>> Snapshot<F> {
    /// HTTP status code for this outcome.
    pub fn status(&self) -> u16 {
        match self {
            Snapshot::Jpeg(_) => 200,
            Snapshot::Unavailable => 503,
        }
    }

    /// Body bytes; empty when unavailable.
    pub fn body(&self) -> &[u8] {
        match self {
            Snapshot::Jpeg(frame) => frame.as_ref(),
            Snapshot::Unavailable => &[],
        }
    }

    /// Value of the `Content-Length` header.
    pub fn content_length(&self) -> usize {
        self.body().len()
    }

    /// Replace the frame with an owned copy, releasing the driver buffer.
    pub fn into_owned(self) -> Snapshot<Vec<u8>> {
        match self {
            Snapshot::Jpeg(frame) => Snapshot::Jpeg(frame.as_ref().to_vec()),
            Snapshot::Unavailable => Snapshot::Unavailable,
        }
    }
}
