// ABOUTME: Splits long text messages into SMPP segments and reassembles inbound multi-part deliver_sm
// ABOUTME: Implements UDH-prefixed and SAR-tagged segmentation per SMPP v3.4 Section 5.2.25

use crate::datatypes::{tags, DataCoding, DestinationAddr, SourceAddr, Tlv};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Per-segment budget in encoded units (octets for binary/8-bit data, septets for
/// GSM-7, code units for UCS-2), before and after the transport-level overhead
/// (6-byte UDH, or nothing for SAR TLVs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBudget {
    pub udh: usize,
    pub sar: usize,
}

const UDH_PREFIX_LEN: usize = 6;

/// Resolve the per-segment budget for a data coding.
pub fn budget_for(data_coding: DataCoding) -> SegmentBudget {
    match data_coding {
        DataCoding::Ucs2 => SegmentBudget { udh: 67, sar: 70 },
        DataCoding::SmscDefault => SegmentBudget { udh: 153, sar: 160 },
        _ => SegmentBudget { udh: 134, sar: 140 },
    }
}

/// Strategy used to carry segment identification across PDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationMethod {
    /// 6-byte User Data Header prefix, esm_class UDHI bit set.
    Udh,
    /// `sar_msg_ref_num`/`sar_total_segments`/`sar_segment_seqnum` TLVs.
    Sar,
}

/// One outbound segment ready to become a `submit_sm`.
#[derive(Debug, Clone)]
pub struct Segment {
    pub short_message: Vec<u8>,
    pub set_udhi: bool,
    pub sar_msg_ref_num: Option<Tlv>,
    pub sar_total_segments: Option<Tlv>,
    pub sar_segment_seqnum: Option<Tlv>,
}

#[derive(Debug, Error)]
pub enum SegmenterError {
    #[error("message produces {0} segments, exceeding the 255-segment limit")]
    TooManySegments(usize),

    #[error("reassembly of reference {reference} from {source_addr} to {dest} timed out")]
    ReassemblyTimeout {
        source_addr: String,
        dest: String,
        reference: u8,
    },
}

/// Split `text` (already encoded to bytes per `data_coding`) into one or more
/// segments using the requested method. A message that fits in a single
/// segment's un-prefixed budget is returned as a single segment with no
/// UDH/SAR framing at all.
pub fn segment(
    bytes: &[u8],
    data_coding: DataCoding,
    method: SegmentationMethod,
    reference: u8,
) -> Result<Vec<Segment>, SegmenterError> {
    let budget = budget_for(data_coding);
    let single_cap = match method {
        SegmentationMethod::Udh => budget.sar, // unprefixed cap
        SegmentationMethod::Sar => budget.sar,
    };

    if bytes.len() <= single_cap {
        return Ok(vec![Segment {
            short_message: bytes.to_vec(),
            set_udhi: false,
            sar_msg_ref_num: None,
            sar_total_segments: None,
            sar_segment_seqnum: None,
        }]);
    }

    let per_segment = match method {
        SegmentationMethod::Udh => budget.udh,
        SegmentationMethod::Sar => budget.sar,
    };

    let chunks: Vec<&[u8]> = bytes.chunks(per_segment).collect();
    if chunks.len() > 255 {
        return Err(SegmenterError::TooManySegments(chunks.len()));
    }
    let total = chunks.len() as u8;

    let segments = chunks
        .into_iter()
        .enumerate()
        .map(|(idx, chunk)| {
            let seq = (idx + 1) as u8;
            match method {
                SegmentationMethod::Udh => {
                    let mut data = Vec::with_capacity(UDH_PREFIX_LEN + chunk.len());
                    data.extend_from_slice(&[0x05, 0x00, 0x03, reference, total, seq]);
                    data.extend_from_slice(chunk);
                    Segment {
                        short_message: data,
                        set_udhi: true,
                        sar_msg_ref_num: None,
                        sar_total_segments: None,
                        sar_segment_seqnum: None,
                    }
                }
                SegmentationMethod::Sar => Segment {
                    short_message: chunk.to_vec(),
                    set_udhi: false,
                    sar_msg_ref_num: Some(Tlv::from_u16(tags::SAR_MSG_REF_NUM, reference as u16)),
                    sar_total_segments: Some(Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, total)),
                    sar_segment_seqnum: Some(Tlv::from_u8(tags::SAR_SEGMENT_SEQNUM, seq)),
                },
            }
        })
        .collect();

    Ok(segments)
}

/// Key identifying one in-flight multi-part message being reassembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReassemblyKey {
    pub source_addr: String,
    pub dest_addr: String,
    pub reference: u8,
}

struct PartialMessage {
    total: u8,
    parts: HashMap<u8, Vec<u8>>,
    first_seen: Instant,
}

/// Buffers inbound segmented `deliver_sm` bodies until every part has
/// arrived or `reassembly_timeout` elapses.
pub struct ReassemblyBuffer {
    timeout: Duration,
    pending: HashMap<ReassemblyKey, PartialMessage>,
}

impl ReassemblyBuffer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pending: HashMap::new(),
        }
    }

    /// Feed one inbound segment. Returns the fully reassembled payload once
    /// every part for its key has arrived.
    pub fn insert(
        &mut self,
        source_addr: &SourceAddr,
        dest_addr: &DestinationAddr,
        reference: u8,
        total: u8,
        seq: u8,
        payload: Vec<u8>,
    ) -> Option<Vec<u8>> {
        let key = ReassemblyKey {
            source_addr: source_addr.to_string(),
            dest_addr: dest_addr.to_string(),
            reference,
        };

        let entry = self.pending.entry(key.clone()).or_insert_with(|| PartialMessage {
            total,
            parts: HashMap::new(),
            first_seen: Instant::now(),
        });
        entry.parts.insert(seq, payload);

        if entry.parts.len() as u8 >= entry.total {
            let entry = self.pending.remove(&key).unwrap();
            let mut assembled = Vec::new();
            for i in 1..=entry.total {
                if let Some(part) = entry.parts.get(&i) {
                    assembled.extend_from_slice(part);
                }
            }
            return Some(assembled);
        }

        None
    }

    /// Evict and report any pending message whose first segment arrived more
    /// than `reassembly_timeout` ago.
    pub fn sweep_expired(&mut self) -> Vec<SegmenterError> {
        let timeout = self.timeout;
        let now = Instant::now();
        let expired: Vec<ReassemblyKey> = self
            .pending
            .iter()
            .filter(|(_, v)| now.duration_since(v.first_seen) > timeout)
            .map(|(k, _)| k.clone())
            .collect();

        expired
            .into_iter()
            .map(|key| {
                self.pending.remove(&key);
                SegmenterError::ReassemblyTimeout {
                    source_addr: key.source_addr,
                    dest: key.dest_addr,
                    reference: key.reference,
                }
            })
            .collect()
    }
}

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
