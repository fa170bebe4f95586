use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};

/// Genesis message used to derive the parent of the first header.
const GENESIS: &[u8] = b"msgfee genesis";

/// A committed block header. The hash is computed once at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub parent: Digest,
    pub height: u64,
    pub timestamp_ms: u64,
    pub data_hash: Digest,

    hash: Digest,
}

impl Header {
    fn compute_hash(parent: &Digest, height: u64, timestamp_ms: u64, data_hash: &Digest) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(parent);
        hasher.update(&height.to_be_bytes());
        hasher.update(&timestamp_ms.to_be_bytes());
        hasher.update(data_hash);
        hasher.finalize()
    }

    pub fn new(parent: Digest, height: u64, timestamp_ms: u64, data_hash: Digest) -> Self {
        let hash = Self::compute_hash(&parent, height, timestamp_ms, &data_hash);
        Self {
            parent,
            height,
            timestamp_ms,
            data_hash,
            hash,
        }
    }

    /// Build the header that follows `self`.
    pub fn child(&self, timestamp_ms: u64, data_hash: Digest) -> Self {
        Self::new(self.hash, self.height + 1, timestamp_ms, data_hash)
    }

    pub fn hash(&self) -> Digest {
        self.hash
    }

    /// Upper-case hex rendering of the header hash.
    pub fn hash_hex(&self) -> String {
        commonware_utils::hex(self.hash.as_ref()).to_uppercase()
    }
}

/// The header at height 0.
pub fn genesis_header() -> Header {
    let parent = Sha256::hash(GENESIS);
    Header::new(parent, 0, 0, Sha256::hash(&[]))
}

impl Write for Header {
    fn write(&self, writer: &mut impl BufMut) {
        self.parent.write(writer);
        self.height.write(writer);
        self.timestamp_ms.write(writer);
        self.data_hash.write(writer);
    }
}

impl Read for Header {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let parent = Digest::read(reader)?;
        let height = u64::read(reader)?;
        let timestamp_ms = u64::read(reader)?;
        let data_hash = Digest::read(reader)?;
        Ok(Self::new(parent, height, timestamp_ms, data_hash))
    }
}

impl EncodeSize for Header {
    fn encode_size(&self) -> usize {
        self.parent.encode_size()
            + self.height.encode_size()
            + self.timestamp_ms.encode_size()
            + self.data_hash.encode_size()
    }
}
