use super::record::RawLayer;
use super::DigestError;

/// Inbound size check that runs before any normalization work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadGuard {
    limit: usize,
}

impl PayloadGuard {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Returns the aggregate raw record count, or rejects the whole request.
    pub fn check(&self, layers: &[RawLayer]) -> Result<usize, DigestError> {
        let received = raw_record_count(layers);
        if received > self.limit {
            tracing::warn!(received, limit = self.limit, "payload guard rejected request");
            return Err(DigestError::Oversize {
                received,
                limit: self.limit,
            });
        }
        Ok(received)
    }
}

pub fn raw_record_count(layers: &[RawLayer]) -> usize {
    layers.iter().map(|layer| layer.records.len()).sum()
}
