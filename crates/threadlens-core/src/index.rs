//! Flat inner-product vector index.
//!
//! Stores unit-length vectors of one fixed dimensionality, contiguously,
//! in insertion order. Search is exhaustive: every stored vector is scored
//! against the query by inner product (cosine similarity for unit vectors)
//! and the `k` best are returned in descending score order, ties broken
//! by insertion position.
//!
//! # Binary format
//!
//! ```text
//! magic     5 bytes   "TLIDX"
//! version   1 byte    FORMAT_VERSION
//! dims      u32 LE
//! count     u64 LE
//! model_len u32 LE
//! model     model_len bytes, UTF-8
//! digest    32 bytes  SHA-256 of the paired metadata file
//! vectors   count × dims × f32 LE
//! ```

use anyhow::{bail, ensure, Context, Result};

use crate::embedding::{dot, l2_normalize};

pub const MAGIC: &[u8; 5] = b"TLIDX";
pub const FORMAT_VERSION: u8 = 1;
/// Length of the metadata digest carried in the header.
pub const DIGEST_LEN: usize = 32;

/// One search hit: position in the index and its similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: usize,
    pub score: f32,
}

/// Exhaustive inner-product index over unit vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dims: usize,
    model: String,
    data: Vec<f32>,
}

/// A decoded index file together with the metadata digest from its header.
#[derive(Debug)]
pub struct DecodedIndex {
    pub index: FlatIndex,
    pub metadata_digest: [u8; DIGEST_LEN],
}

impl FlatIndex {
    pub fn new(dims: usize, model: impl Into<String>) -> Result<Self> {
        ensure!(dims > 0, "index dimensionality must be > 0");
        Ok(Self {
            dims,
            model: model.into(),
            data: Vec::new(),
        })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Name of the embedding model the vectors came from.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector. It is normalized to unit length on the way in.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        ensure!(
            vector.len() == self.dims,
            "vector has {} dimensions, index expects {}",
            vector.len(),
            self.dims
        );
        let start = self.data.len();
        self.data.extend_from_slice(vector);
        l2_normalize(&mut self.data[start..]);
        Ok(())
    }

    /// The stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dims)?;
        self.data.get(start..start + self.dims)
    }

    /// Return up to `k` hits for `query`, best first.
    ///
    /// `query` must have the index dimensionality and should already be
    /// unit length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        ensure!(
            query.len() == self.dims,
            "query has {} dimensions, index expects {}",
            query.len(),
            self.dims
        );
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<Hit> = self
            .data
            .chunks_exact(self.dims)
            .enumerate()
            .map(|(position, v)| Hit {
                position,
                score: dot(query, v),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.position.cmp(&b.position))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Serialize the index, recording the digest of its paired metadata.
    pub fn encode(&self, metadata_digest: &[u8; DIGEST_LEN]) -> Vec<u8> {
        let model = self.model.as_bytes();
        let mut out =
            Vec::with_capacity(MAGIC.len() + 1 + 4 + 8 + 4 + model.len() + DIGEST_LEN + self.data.len() * 4);
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&(self.dims as u32).to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        out.extend_from_slice(&(model.len() as u32).to_le_bytes());
        out.extend_from_slice(model);
        out.extend_from_slice(metadata_digest);
        for &v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Parse an index file produced by [`FlatIndex::encode`].
    pub fn decode(bytes: &[u8]) -> Result<DecodedIndex> {
        let mut r = Reader { bytes, pos: 0 };

        let magic = r.take(MAGIC.len()).context("index file truncated")?;
        if magic != MAGIC {
            bail!("not a threadlens index file (bad magic)");
        }
        let version = r.take(1).context("index file truncated")?[0];
        if version != FORMAT_VERSION {
            bail!(
                "unsupported index format version {} (expected {})",
                version,
                FORMAT_VERSION
            );
        }

        let dims = r.u32().context("index header truncated")? as usize;
        let count = r.u64().context("index header truncated")? as usize;
        let model_len = r.u32().context("index header truncated")? as usize;
        let model = std::str::from_utf8(r.take(model_len).context("index header truncated")?)
            .context("index model name is not valid UTF-8")?
            .to_string();
        let mut metadata_digest = [0u8; DIGEST_LEN];
        metadata_digest.copy_from_slice(r.take(DIGEST_LEN).context("index header truncated")?);

        ensure!(dims > 0, "index header declares zero dimensions");
        let expected = count
            .checked_mul(dims)
            .and_then(|n| n.checked_mul(4))
            .context("index header declares an impossible size")?;
        let body = &bytes[r.pos..];
        if body.len() != expected {
            bail!(
                "index body is {} bytes, header declares {} vectors × {} dims ({} bytes)",
                body.len(),
                count,
                dims,
                expected
            );
        }

        let data = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(DecodedIndex {
            index: FlatIndex { dims, model, data },
            metadata_digest,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.bytes.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Option<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Some(u64::from_le_bytes(arr))
    }
}
