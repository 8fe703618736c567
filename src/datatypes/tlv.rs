use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::Cursor;

use crate::codec::{CodecError, Encodable};

/// Canonical SMPP v3.4 TLV tag registry (Issue 1.2, plus the v5.0 tags this
/// crate still recognizes on the wire even though it does not expose typed
/// fields for them).
pub mod tags {
    pub const DEST_ADDR_SUBUNIT: u16 = 0x0005;
    pub const DEST_NETWORK_TYPE: u16 = 0x0006;
    pub const DEST_BEARER_TYPE: u16 = 0x0007;
    pub const DEST_TELEMATICS_ID: u16 = 0x0008;
    pub const SOURCE_ADDR_SUBUNIT: u16 = 0x000D;
    pub const SOURCE_NETWORK_TYPE: u16 = 0x000E;
    pub const SOURCE_BEARER_TYPE: u16 = 0x000F;
    pub const SOURCE_TELEMATICS_ID: u16 = 0x0010;
    pub const QOS_TIME_TO_LIVE: u16 = 0x0017;
    pub const PAYLOAD_TYPE: u16 = 0x0019;
    pub const ADDITIONAL_STATUS_INFO_TEXT: u16 = 0x001D;
    pub const RECEIPTED_MESSAGE_ID: u16 = 0x001E;
    pub const MS_MSG_WAIT_FACILITIES: u16 = 0x0030;
    pub const PRIVACY_INDICATOR: u16 = 0x0201;
    pub const SOURCE_SUBADDRESS: u16 = 0x0202;
    pub const DEST_SUBADDRESS: u16 = 0x0203;
    pub const USER_MESSAGE_REFERENCE: u16 = 0x0204;
    pub const USER_RESPONSE_CODE: u16 = 0x0205;
    pub const SOURCE_PORT: u16 = 0x020A;
    pub const DESTINATION_PORT: u16 = 0x020B;
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const LANGUAGE_INDICATOR: u16 = 0x020D;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const CALLBACK_NUM_PRES_IND: u16 = 0x0302;
    pub const CALLBACK_NUM_ATAG: u16 = 0x0303;
    pub const NUMBER_OF_MESSAGES: u16 = 0x0304;
    pub const CALLBACK_NUM: u16 = 0x0381;
    pub const DPF_RESULT: u16 = 0x0420;
    pub const SET_DPF: u16 = 0x0421;
    pub const MS_AVAILABILITY_STATUS: u16 = 0x0422;
    pub const NETWORK_ERROR_CODE: u16 = 0x0423;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
    pub const DELIVERY_FAILURE_REASON: u16 = 0x0425;
    pub const MORE_MESSAGES_TO_SEND: u16 = 0x0426;
    pub const MESSAGE_STATE: u16 = 0x0427;
    pub const USSD_SERVICE_OP: u16 = 0x0501;
    pub const DISPLAY_TIME: u16 = 0x1201;
    pub const SMS_SIGNAL: u16 = 0x1203;
    pub const MS_VALIDITY: u16 = 0x1204;
    pub const ALERT_ON_MSG_DELIVERY: u16 = 0x130C;
    pub const ITS_REPLY_TYPE: u16 = 0x1380;
    pub const ITS_SESSION_INFO: u16 = 0x1383;

    // SMPP v5.0 tags, decoded as opaque TLVs for forward-compatibility only.
    pub const CONGESTION_STATE: u16 = 0x0428;
    pub const BILLING_IDENTIFICATION: u16 = 0x060B;
    pub const SOURCE_NODE_ID: u16 = 0x060C;
    pub const DEST_NODE_ID: u16 = 0x060D;
    pub const SOURCE_NETWORK_ID: u16 = 0x060E;
    pub const DEST_NETWORK_ID: u16 = 0x060F;
}

/// A single Tag-Length-Value optional parameter.
#[derive(Clone, PartialEq)]
pub struct Tlv {
    /// Uniquely identifies the optional parameter per the registry in [`tags`].
    pub tag: u16,
    /// Length of `value` in octets. Not required to be trusted by callers;
    /// [`Tlv::encoded_size`] always uses `value.len()`.
    pub length: u16,
    /// The parameter payload.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        let value = value.into();
        Self {
            tag,
            length: value.len() as u16,
            value,
        }
    }

    pub fn from_u8(tag: u16, value: u8) -> Self {
        Self::new(tag, Bytes::copy_from_slice(&[value]))
    }

    pub fn from_u16(tag: u16, value: u16) -> Self {
        Self::new(tag, Bytes::copy_from_slice(&value.to_be_bytes()))
    }

    pub fn from_cstr(tag: u16, value: &str) -> Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        Self::new(tag, Bytes::from(bytes))
    }

    pub fn as_u8(&self) -> Option<u8> {
        self.value.first().copied()
    }

    pub fn as_u16(&self) -> Option<u16> {
        if self.value.len() != 2 {
            return None;
        }
        Some(u16::from_be_bytes([self.value[0], self.value[1]]))
    }

    pub fn as_cstr(&self) -> Option<&str> {
        let bytes = self
            .value
            .iter()
            .position(|&b| b == 0)
            .map(|i| &self.value[..i])
            .unwrap_or(&self.value[..]);
        std::str::from_utf8(bytes).ok()
    }

    /// Convert the TLV to bytes without a surrounding PDU header.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf).expect("TLV encoding should not fail");
        buf.freeze()
    }

    /// Decode a single TLV from the buffer.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < 4 {
            return Err(CodecError::Incomplete);
        }

        let tag = buf.get_u16();
        let length = buf.get_u16();

        if buf.remaining() < length as usize {
            return Err(CodecError::Incomplete);
        }

        let mut value_bytes = vec![0u8; length as usize];
        buf.copy_to_slice(&mut value_bytes);
        let value = Bytes::from(value_bytes);

        Ok(Self { tag, length, value })
    }
}

impl Encodable for Tlv {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u16(self.tag);
        buf.put_u16(self.value.len() as u16);
        buf.extend_from_slice(&self.value);
        Ok(())
    }

    fn encoded_size(&self) -> usize {
        4 + self.value.len()
    }
}

impl fmt::Debug for Tlv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tlv {{ tag: 0x{:04X}, len: {}, value: {:?} }}",
            self.tag, self.length, self.value
        )
    }
}

impl fmt::Display for Tlv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag=0x{:04X} len={} value=", self.tag, self.value.len())?;
        for byte in self.value.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Find a TLV by tag in a decoded optional-parameters list.
pub fn find(params: &[Tlv], tag: u16) -> Option<&Tlv> {
    params.iter().find(|t| t.tag == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tlv_to_bytes_basic() {
        let tlv = Tlv::new(0x0010, Bytes::from_static(&[0x01, 0x02, 0x03, 0x04]));
        let bytes = tlv.to_bytes();
        assert_eq!(
            bytes.as_ref(),
            &[0x00, 0x10, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn tlv_to_bytes_empty_value() {
        let tlv = Tlv::new(tags::USER_MESSAGE_REFERENCE, Bytes::new());
        assert_eq!(tlv.to_bytes().as_ref(), &[0x02, 0x04, 0x00, 0x00]);
    }

    #[test]
    fn tlv_roundtrip() {
        let original = Tlv::new(tags::SOURCE_PORT, Bytes::from_static(&[0xAA, 0xBB, 0xCC]));
        let bytes = original.to_bytes();
        let mut cursor = Cursor::new(&bytes[..]);
        let decoded = Tlv::decode(&mut cursor).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn tlv_accessors() {
        let one_byte = Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, 3);
        assert_eq!(one_byte.as_u8(), Some(3));

        let two_byte = Tlv::from_u16(tags::SOURCE_PORT, 5060);
        assert_eq!(two_byte.as_u16(), Some(5060));

        let cstr = Tlv::from_cstr(tags::RECEIPTED_MESSAGE_ID, "abc123");
        assert_eq!(cstr.as_cstr(), Some("abc123"));
    }

    #[test]
    fn canonical_tag_values_match_go_smpp_registry() {
        assert_eq!(tags::SAR_MSG_REF_NUM, 0x020C);
        assert_eq!(tags::LANGUAGE_INDICATOR, 0x020D);
        assert_eq!(tags::SAR_TOTAL_SEGMENTS, 0x020E);
        assert_eq!(tags::SAR_SEGMENT_SEQNUM, 0x020F);
        assert_eq!(tags::DESTINATION_PORT, 0x020B);
    }

    #[test]
    fn find_by_tag() {
        let params = vec![
            Tlv::from_u16(tags::SAR_MSG_REF_NUM, 7),
            Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, 3),
        ];
        assert_eq!(find(&params, tags::SAR_TOTAL_SEGMENTS).unwrap().as_u8(), Some(3));
        assert!(find(&params, tags::MESSAGE_PAYLOAD).is_none());
    }
}
