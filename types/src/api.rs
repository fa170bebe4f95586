use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, Read, ReadExt, Write};
use serde::{Deserialize, Serialize};

/// Selects a block by height, or the latest one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query {
    Latest,
    Index(u64),
}

impl From<Option<u64>> for Query {
    fn from(height: Option<u64>) -> Self {
        match height {
            Some(height) => Query::Index(height),
            None => Query::Latest,
        }
    }
}

impl Write for Query {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Query::Latest => 0u8.write(writer),
            Query::Index(index) => {
                1u8.write(writer);
                index.write(writer);
            }
        }
    }
}

impl Read for Query {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Query::Latest),
            1 => Ok(Query::Index(u64::read(reader)?)),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Query {
    fn encode_size(&self) -> usize {
        1 + match self {
            Query::Latest => 0,
            Query::Index(index) => index.encode_size(),
        }
    }
}

/// Sync status reported for a block: its height, hash and the running node version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInfo {
    pub block_height: u64,
    pub block_hash: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_codec::{DecodeExt, Encode};

    #[test]
    fn query_from_optional_height() {
        assert_eq!(Query::from(None), Query::Latest);
        assert_eq!(Query::from(Some(7)), Query::Index(7));
    }

    #[test]
    fn query_rejects_unknown_tag() {
        assert!(matches!(
            Query::decode([2u8].as_slice()),
            Err(Error::InvalidEnum(2))
        ));
        assert_eq!(Query::decode(Query::Index(9).encode()).unwrap(), Query::Index(9));
    }

    #[test]
    fn sync_info_json_shape() {
        let info = SyncInfo {
            block_height: 12,
            block_hash: "AB".to_string(),
            version: "0.0.1".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["block_height"], 12);
        assert_eq!(json["block_hash"], "AB");
        assert_eq!(json["version"], "0.0.1");
    }
}
