//! Decoding raw byte streams into operation sequences.
//!
//! Each input byte selects one opcode through a fixed table indexed by
//! `byte % 4`. The table order is part of the corpus format: reordering it
//! changes what every saved seed replays as.

use oracle::DiscardReason;

use super::{FIELD_CONTACT_NUMBER, FIELD_NAME, Opcode, Operation, OperationSequence, Payload};

/// Maximum number of operations decoded from one input
pub const MAX_OPERATIONS: usize = 10;

/// Opcode table indexed by `byte % 4`
pub const OPCODE_TABLE: [Opcode; 4] = [Opcode::Create, Opcode::Read, Opcode::Update, Opcode::Delete];

impl Opcode {
    /// The opcode selected by one input byte
    pub fn from_byte(byte: u8) -> Self {
        OPCODE_TABLE[(byte % OPCODE_TABLE.len() as u8) as usize]
    }

    /// The canonical byte that decodes to this opcode
    pub fn to_byte(self) -> u8 {
        match self {
            Opcode::Create => 0,
            Opcode::Read => 1,
            Opcode::Update => 2,
            Opcode::Delete => 3,
        }
    }
}

/// Typed seed values shared by every operation of one run.
///
/// Values are kept as raw bytes: a generation engine can hand over any
/// byte string, and invalid encodings are filtered at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedValues {
    /// Resource key (an email address in the user service)
    pub key: Vec<u8>,
    /// Display name
    pub name: Vec<u8>,
    /// Contact number written by Create
    pub value1: Vec<u8>,
    /// Contact number written by Update
    pub value2: Vec<u8>,
}

impl SeedValues {
    pub fn new(
        key: impl Into<Vec<u8>>,
        name: impl Into<Vec<u8>>,
        value1: impl Into<Vec<u8>>,
        value2: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            value1: value1.into(),
            value2: value2.into(),
        }
    }

    /// The same seeds with a key unique to `run_id`.
    ///
    /// Concurrent runs against one shared system each get their own key, so
    /// they never observe each other's state. An empty key stays empty so the
    /// input is still discarded.
    pub fn partitioned(&self, run_id: u64) -> Self {
        if self.key.is_empty() {
            return self.clone();
        }
        let mut key = self.key.clone();
        key.extend_from_slice(format!("#{}", run_id).as_bytes());
        Self {
            key,
            ..self.clone()
        }
    }
}

/// Seeds after encoding validation
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidSeeds {
    key: String,
    name: String,
    value1: String,
    value2: String,
}

fn text(field: &'static str, raw: &[u8]) -> Result<String, DiscardReason> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| DiscardReason::InvalidEncoding { field })
}

impl TryFrom<&SeedValues> for ValidSeeds {
    type Error = DiscardReason;

    fn try_from(seeds: &SeedValues) -> Result<Self, Self::Error> {
        if seeds.key.is_empty() {
            return Err(DiscardReason::EmptyKey);
        }
        Ok(Self {
            key: text("key", &seeds.key)?,
            name: text("name", &seeds.name)?,
            value1: text("value1", &seeds.value1)?,
            value2: text("value2", &seeds.value2)?,
        })
    }
}

/// Pure decoder from raw bytes plus seeds to an operation sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationDecoder;

impl OperationDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `raw` into at most [`MAX_OPERATIONS`] operations.
    ///
    /// Identical inputs always produce identical sequences. An empty key or a
    /// seed that is not valid UTF-8 discards the whole input.
    pub fn decode(&self, raw: &[u8], seeds: &SeedValues) -> Result<OperationSequence, DiscardReason> {
        let seeds = ValidSeeds::try_from(seeds)?;

        let create_payload = Payload::new()
            .with(FIELD_NAME, seeds.name.as_str())
            .with(FIELD_CONTACT_NUMBER, seeds.value1.as_str());
        let update_payload = Payload::new().with(FIELD_CONTACT_NUMBER, seeds.value2.as_str());

        let mut sequence = OperationSequence::new(seeds.key.as_str());
        for &byte in raw.iter().take(MAX_OPERATIONS) {
            let key = seeds.key.clone();
            let op = match Opcode::from_byte(byte) {
                Opcode::Create => Operation::Create {
                    key,
                    payload: create_payload.clone(),
                },
                Opcode::Read => Operation::Read { key },
                Opcode::Update => Operation::Update {
                    key,
                    payload: update_payload.clone(),
                },
                Opcode::Delete => Operation::Delete { key },
            };
            sequence.push(op);
        }

        Ok(sequence)
    }
}

/// Decode with the default decoder
pub fn decode(raw: &[u8], seeds: &SeedValues) -> Result<OperationSequence, DiscardReason> {
    OperationDecoder::new().decode(raw, seeds)
}
