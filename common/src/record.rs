//! Binary layout of [`ConfigurationRecord`] in the backing store.
//!
//! All integers are little-endian. Every text field occupies its maximum
//! length plus one byte and is NUL padded, so the block size never changes.
//!
//! | Offset | Size | Content |
//! |--------|------|---------|
//! | 0      | 4    | magic `TBCR` |
//! | 4      | 2    | schema version |
//! | 6      | 2    | reserved, zero |
//! | 8      | 450  | text fields, in declaration order |
//! | 458    | 14   | desired temp, padding, heat flag, auto flag, wifi timeout |
//! | 472    | 32   | SHA-256 of bytes `0..472` |

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    config::{
        ConfigurationRecord, ADMIN_PWD_MAX_LEN, ADMIN_USER_MAX_LEN, HEADING_MAX_LEN,
        HOSTNAME_MAX_LEN, IPV4_MAX_LEN, PASSWORD_MAX_LEN, SSID_MAX_LEN, TITLE_MAX_LEN,
    },
    text::truncate,
    types::ControlMode,
};

/// ASCII "TBCR".
pub const RECORD_MAGIC: [u8; 4] = *b"TBCR";

/// Bump whenever the field list or widths change.
pub const SCHEMA_VERSION: u16 = 1;

pub const HEADER_LEN: usize = 8;
pub const TAG_LEN: usize = 32;

const TEXT_LEN: usize = (HOSTNAME_MAX_LEN + 1)
    + (SSID_MAX_LEN + 1)
    + (PASSWORD_MAX_LEN + 1)
    + (ADMIN_USER_MAX_LEN + 1)
    + (ADMIN_PWD_MAX_LEN + 1)
    + (SSID_MAX_LEN + 1)
    + (PASSWORD_MAX_LEN + 1)
    + 3 * (IPV4_MAX_LEN + 1)
    + (TITLE_MAX_LEN + 1)
    + (HEADING_MAX_LEN + 1)
    + (IPV4_MAX_LEN + 1);

const SCALAR_LEN: usize = 4 + 4 + 1 + 1 + 4;

/// Bytes covered by the integrity tag.
pub const PAYLOAD_LEN: usize = HEADER_LEN + TEXT_LEN + SCALAR_LEN;

/// Total size of one persisted block.
pub const BLOCK_LEN: usize = PAYLOAD_LEN + TAG_LEN;

pub type IntegrityTag = [u8; TAG_LEN];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record is {found} bytes, expected {expected}")]
    Length { found: usize, expected: usize },
    #[error("record magic mismatch")]
    Magic,
    #[error("integrity tag mismatch")]
    Integrity,
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u16),
    #[error("field `{0}` is malformed")]
    Field(&'static str),
}

/// SHA-256 over `payload`. Used for corruption detection only.
pub fn integrity_tag(payload: &[u8]) -> IntegrityTag {
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&Sha256::digest(payload));
    tag
}

/// Tag the record would carry if it were written right now.
pub fn compute_tag(record: &ConfigurationRecord) -> IntegrityTag {
    integrity_tag(&encode_payload(record))
}

/// Serializes `record` and appends a freshly computed tag.
pub fn encode(record: &ConfigurationRecord) -> Vec<u8> {
    let mut block = encode_payload(record);
    let tag = integrity_tag(&block);
    block.extend_from_slice(&tag);
    block
}

fn encode_payload(record: &ConfigurationRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BLOCK_LEN);
    buf.extend_from_slice(&RECORD_MAGIC);
    buf.extend_from_slice(&SCHEMA_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());

    put_text(&mut buf, &record.hostname, HOSTNAME_MAX_LEN);
    put_text(&mut buf, &record.ssid, SSID_MAX_LEN);
    put_text(&mut buf, &record.pwd, PASSWORD_MAX_LEN);
    put_text(&mut buf, &record.admin_user, ADMIN_USER_MAX_LEN);
    put_text(&mut buf, &record.admin_pwd, ADMIN_PWD_MAX_LEN);
    put_text(&mut buf, &record.ap_ssid, SSID_MAX_LEN);
    put_text(&mut buf, &record.ap_pwd, PASSWORD_MAX_LEN);
    put_text(&mut buf, &record.ap_net_ip, IPV4_MAX_LEN);
    put_text(&mut buf, &record.ap_subnet, IPV4_MAX_LEN);
    put_text(&mut buf, &record.ap_gateway, IPV4_MAX_LEN);
    put_text(&mut buf, &record.title, TITLE_MAX_LEN);
    put_text(&mut buf, &record.heading, HEADING_MAX_LEN);
    put_text(&mut buf, &record.sensor_ip, IPV4_MAX_LEN);

    buf.extend_from_slice(&record.desired_temp.to_bits().to_le_bytes());
    buf.extend_from_slice(&record.temp_padding.to_bits().to_le_bytes());
    buf.push(u8::from(record.mode == ControlMode::Heat));
    buf.push(u8::from(record.auto_control));
    buf.extend_from_slice(&record.wifi_timeout_ms.to_le_bytes());
    buf
}

fn put_text(buf: &mut Vec<u8>, value: &str, max_len: usize) {
    let value = truncate(value, max_len);
    buf.extend_from_slice(value.as_bytes());
    buf.resize(buf.len() + (max_len + 1 - value.len()), 0);
}

/// Parses a block, checking size, magic, tag and version before any field
/// is read.
///
/// Each schema version has its own field reader. When the layout changes,
/// the previous reader stays in the `match` below and its result is
/// upgraded to the current [`ConfigurationRecord`] there, so a device
/// keeps its settings across the change. Versions with no reader are
/// rejected and the caller falls back to factory defaults.
pub fn decode(block: &[u8]) -> Result<ConfigurationRecord, DecodeError> {
    if block.len() != BLOCK_LEN {
        return Err(DecodeError::Length {
            found: block.len(),
            expected: BLOCK_LEN,
        });
    }
    if block[0..4] != RECORD_MAGIC {
        return Err(DecodeError::Magic);
    }

    let (payload, stored_tag) = block.split_at(PAYLOAD_LEN);
    if integrity_tag(payload).as_slice() != stored_tag {
        return Err(DecodeError::Integrity);
    }

    let version = u16::from_le_bytes([block[4], block[5]]);
    match version {
        SCHEMA_VERSION => decode_v1(&payload[HEADER_LEN..]),
        other => Err(DecodeError::UnsupportedVersion(other)),
    }
}

fn decode_v1(fields: &[u8]) -> Result<ConfigurationRecord, DecodeError> {
    let mut reader = Reader { rest: fields };

    let record = ConfigurationRecord {
        hostname: reader.text("hostname", HOSTNAME_MAX_LEN)?,
        ssid: reader.text("ssid", SSID_MAX_LEN)?,
        pwd: reader.text("pwd", PASSWORD_MAX_LEN)?,
        admin_user: reader.text("admin_user", ADMIN_USER_MAX_LEN)?,
        admin_pwd: reader.text("admin_pwd", ADMIN_PWD_MAX_LEN)?,
        ap_ssid: reader.text("ap_ssid", SSID_MAX_LEN)?,
        ap_pwd: reader.text("ap_pwd", PASSWORD_MAX_LEN)?,
        ap_net_ip: reader.text("ap_net_ip", IPV4_MAX_LEN)?,
        ap_subnet: reader.text("ap_subnet", IPV4_MAX_LEN)?,
        ap_gateway: reader.text("ap_gateway", IPV4_MAX_LEN)?,
        title: reader.text("title", TITLE_MAX_LEN)?,
        heading: reader.text("heading", HEADING_MAX_LEN)?,
        sensor_ip: reader.text("sensor_ip", IPV4_MAX_LEN)?,
        desired_temp: reader.finite_f32("desired_temp")?,
        temp_padding: reader.finite_f32("temp_padding")?,
        mode: if reader.flag("mode")? {
            ControlMode::Heat
        } else {
            ControlMode::Cool
        },
        auto_control: reader.flag("auto_control")?,
        wifi_timeout_ms: u32::from_le_bytes(reader.array()),
    };

    Ok(record)
}

struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    // Callers only read within the fixed layout, which `decode` has already
    // length-checked.
    fn take(&mut self, len: usize) -> &'a [u8] {
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        head
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N));
        out
    }

    fn text(&mut self, name: &'static str, max_len: usize) -> Result<String, DecodeError> {
        let raw = self.take(max_len + 1);
        let end = raw
            .iter()
            .position(|byte| *byte == 0)
            .ok_or(DecodeError::Field(name))?;
        std::str::from_utf8(&raw[..end])
            .map(str::to_string)
            .map_err(|_| DecodeError::Field(name))
    }

    fn finite_f32(&mut self, name: &'static str) -> Result<f32, DecodeError> {
        let value = f32::from_bits(u32::from_le_bytes(self.array()));
        if value.is_finite() {
            Ok(value)
        } else {
            Err(DecodeError::Field(name))
        }
    }

    fn flag(&mut self, name: &'static str) -> Result<bool, DecodeError> {
        match self.take(1)[0] {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::Field(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::factory_template;
    use pretty_assertions::assert_eq;

    fn reseal(block: &mut [u8]) {
        let tag = integrity_tag(&block[..PAYLOAD_LEN]);
        block[PAYLOAD_LEN..].copy_from_slice(&tag);
    }

    fn customized() -> ConfigurationRecord {
        ConfigurationRecord {
            ssid: "HomeNet".to_string(),
            pwd: "hunter2hunter2".to_string(),
            sensor_ip: "192.168.1.40".to_string(),
            desired_temp: 68.5,
            temp_padding: 1.5,
            mode: ControlMode::Cool,
            auto_control: true,
            ..factory_template()
        }
    }

    #[test]
    fn layout_is_fixed_size() {
        assert_eq!(PAYLOAD_LEN, 472);
        assert_eq!(BLOCK_LEN, 504);
        assert_eq!(encode(&factory_template()).len(), BLOCK_LEN);
        assert_eq!(encode(&customized()).len(), BLOCK_LEN);
    }

    #[test]
    fn decode_restores_encoded_record() {
        let record = customized();
        assert_eq!(decode(&encode(&record)), Ok(record));
    }

    #[test]
    fn header_carries_magic_and_version() {
        let block = encode(&factory_template());
        assert_eq!(&block[0..4], b"TBCR");
        assert_eq!(u16::from_le_bytes([block[4], block[5]]), SCHEMA_VERSION);
        assert_eq!(&block[PAYLOAD_LEN..], compute_tag(&factory_template()).as_slice());
    }

    #[test]
    fn tag_tracks_every_field() {
        let base = compute_tag(&factory_template());
        let mut changed = factory_template();
        changed.heading = "Garage".to_string();
        assert_ne!(compute_tag(&changed), base);

        let mut changed = factory_template();
        changed.wifi_timeout_ms += 1;
        assert_ne!(compute_tag(&changed), base);
    }

    #[test]
    fn any_flipped_byte_is_detected() {
        let block = encode(&customized());
        for index in [0, 5, 8, 120, 300, 460, 471, 480, BLOCK_LEN - 1] {
            let mut damaged = block.clone();
            damaged[index] ^= 0x01;
            assert!(decode(&damaged).is_err(), "flip at {index} went unnoticed");
        }
    }

    #[test]
    fn integrity_failure_reported_before_fields() {
        let mut block = encode(&customized());
        block[40] ^= 0xFF;
        assert_eq!(decode(&block), Err(DecodeError::Integrity));
    }

    #[test]
    fn unknown_version_rejected_even_with_valid_tag() {
        let mut block = encode(&customized());
        block[4..6].copy_from_slice(&2u16.to_le_bytes());
        reseal(&mut block);
        assert_eq!(decode(&block), Err(DecodeError::UnsupportedVersion(2)));

        block[4..6].copy_from_slice(&0u16.to_le_bytes());
        reseal(&mut block);
        assert_eq!(decode(&block), Err(DecodeError::UnsupportedVersion(0)));
    }

    #[test]
    fn current_version_dispatches_to_field_reader() {
        let block = encode(&customized());
        assert_eq!(decode(&block), decode_v1(&block[HEADER_LEN..PAYLOAD_LEN]));
    }

    #[test]
    fn malformed_flag_is_a_field_error() {
        let mut block = encode(&customized());
        block[PAYLOAD_LEN - 6] = 7;
        reseal(&mut block);
        assert_eq!(decode(&block), Err(DecodeError::Field("mode")));
    }

    #[test]
    fn blank_and_short_blocks_rejected() {
        assert_eq!(
            decode(&[]),
            Err(DecodeError::Length {
                found: 0,
                expected: BLOCK_LEN
            })
        );
        assert_eq!(decode(&[0xFF; BLOCK_LEN]), Err(DecodeError::Magic));
    }

    #[test]
    fn overlong_text_is_cut_on_write() {
        let mut record = factory_template();
        record.admin_user = "a-very-long-admin-name".to_string();
        let decoded = decode(&encode(&record)).expect("decodes");
        assert_eq!(decoded.admin_user, "a-very-long-");
    }
}
