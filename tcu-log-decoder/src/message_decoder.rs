//! Message Decoding Engine
//!
//! Extracts signal values from raw payload bytes based on signal definitions
//! from the signal database. Handles bit extraction, endianness, multiplexing,
//! value tables and physical value conversion.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::types::{DecoderError, Result, SignalValue};

/// Message decoder - extracts signals from payload bytes
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode a payload into `(signal name, value)` pairs in definition order
    ///
    /// A payload shorter than the message's declared size is rejected. Bytes
    /// beyond the declared size are ignored.
    pub fn decode_message(
        message_def: &MessageDefinition,
        data: &[u8],
    ) -> Result<Vec<(String, SignalValue)>> {
        if data.len() < message_def.size {
            return Err(DecoderError::PayloadLength {
                message: message_def.name.clone(),
                expected: message_def.size,
                actual: data.len(),
            });
        }

        // For multiplexed messages, first extract the multiplexer signal value
        let multiplexer_value = match (&message_def.multiplexer_signal, message_def.is_multiplexed) {
            (Some(mux_signal_name), true) => message_def
                .signals
                .iter()
                .find(|s| s.name == *mux_signal_name)
                .map(|mux_signal| Self::extract_signal_value(data, mux_signal))
                .transpose()?
                .map(|value| value as u64),
            _ => None,
        };

        let mut decoded = Vec::with_capacity(message_def.signals.len());
        for signal in &message_def.signals {
            if let Some(ref mux_info) = signal.multiplexer_info {
                match multiplexer_value {
                    Some(current) if mux_info.multiplexer_values.contains(&current) => {}
                    _ => continue,
                }
            }

            let raw_value = Self::extract_signal_value(data, signal)?;
            decoded.push((signal.name.clone(), Self::physical_value(signal, raw_value)));
        }

        Ok(decoded)
    }

    /// Convert a raw value into its physical or symbolic representation
    fn physical_value(signal: &SignalDefinition, raw_value: i64) -> SignalValue {
        if let Some(label) = signal
            .value_table
            .as_ref()
            .and_then(|table| table.get(&raw_value))
        {
            return SignalValue::Symbolic(label.clone());
        }

        let integral = signal.factor.fract() == 0.0 && signal.offset.fract() == 0.0;
        if integral {
            SignalValue::Integer(
                raw_value
                    .saturating_mul(signal.factor as i64)
                    .saturating_add(signal.offset as i64),
            )
        } else {
            SignalValue::Float(signal.offset + signal.factor * (raw_value as f64))
        }
    }

    /// Extract raw signal value from payload bytes
    fn extract_signal_value(data: &[u8], signal: &SignalDefinition) -> Result<i64> {
        let start_bit = signal.start_bit as usize;
        let length = signal.length as usize;

        if length == 0 || length > 64 {
            return Err(DecoderError::InvalidSignalDefinition(format!(
                "Signal '{}' has unsupported length {}",
                signal.name, length
            )));
        }

        let raw_value = match signal.byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(data, start_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(data, start_bit, length),
        }
        .ok_or_else(|| {
            DecoderError::InvalidData(format!(
                "Signal '{}' does not fit in {} payload bytes",
                signal.name,
                data.len()
            ))
        })?;

        Ok(match signal.value_type {
            ValueType::Unsigned => raw_value as i64,
            ValueType::Signed => Self::sign_extend(raw_value, length),
        })
    }

    /// Extract signal with little-endian (Intel) byte order
    ///
    /// Start bit points to the LSB; bits are numbered LSB-first within each byte.
    fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> Option<u64> {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte = data.get(bit_pos / 8)?;
            let bit_value = (byte >> (bit_pos % 8)) & 0x01;
            result |= (bit_value as u64) << i;
        }

        Some(result)
    }

    /// Extract signal with big-endian (Motorola) byte order
    ///
    /// Start bit points to the MSB, using the DBC numbering where bit 7 is the
    /// MSB of byte 0. Walking towards the LSB moves down within a byte and
    /// then to bit 7 of the next byte.
    fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> Option<u64> {
        let mut result: u64 = 0;
        let mut bit_pos = start_bit;

        for _ in 0..length {
            let byte = data.get(bit_pos / 8)?;
            let bit_value = (byte >> (bit_pos % 8)) & 0x01;
            result = (result << 1) | bit_value as u64;

            bit_pos = if bit_pos % 8 == 0 { bit_pos + 15 } else { bit_pos - 1 };
        }

        Some(result)
    }

    /// Sign-extend a value from N bits to 64 bits
    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::database::MultiplexerInfo;
    use std::collections::HashMap;

    fn signal(name: &str, start_bit: u16, length: u16, byte_order: ByteOrder) -> SignalDefinition {
        SignalDefinition {
            name: name.to_string(),
            start_bit,
            length,
            byte_order,
            value_type: ValueType::Unsigned,
            factor: 1.0,
            offset: 0.0,
            value_table: None,
            multiplexer_info: None,
        }
    }

    fn message(size: usize, signals: Vec<SignalDefinition>) -> MessageDefinition {
        MessageDefinition {
            id: 0xC8,
            name: "TestMsg".to_string(),
            size,
            signals,
            is_multiplexed: false,
            multiplexer_signal: None,
            source: "test.dbc".to_string(),
        }
    }

    #[test]
    fn test_extract_little_endian_simple() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_little_endian(&data, 0, 8), Some(0xAB));
    }

    #[test]
    fn test_extract_little_endian_cross_byte() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_little_endian(&data, 0, 16), Some(0xCDAB));
    }

    #[test]
    fn test_extract_big_endian_simple() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_big_endian(&data, 7, 8), Some(0xAB));
    }

    #[test]
    fn test_extract_big_endian_cross_byte() {
        let data = vec![0x11, 0x22, 0x33];
        assert_eq!(MessageDecoder::extract_big_endian(&data, 7, 16), Some(0x1122));
        assert_eq!(MessageDecoder::extract_big_endian(&data, 3, 8), Some(0x12));
    }

    #[test]
    fn test_extract_out_of_range() {
        let data = vec![0x11];
        assert_eq!(MessageDecoder::extract_little_endian(&data, 4, 8), None);
        assert_eq!(MessageDecoder::extract_big_endian(&data, 7, 16), None);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(MessageDecoder::sign_extend(0x7F, 8), 127);
        assert_eq!(MessageDecoder::sign_extend(0xFF, 8), -1);
        assert_eq!(MessageDecoder::sign_extend(0x8000, 16), -32768);
    }

    #[test]
    fn test_decode_preserves_definition_order() {
        let msg = message(
            3,
            vec![
                signal("Zeta", 16, 8, ByteOrder::LittleEndian),
                signal("Alpha", 0, 16, ByteOrder::LittleEndian),
            ],
        );

        let decoded = MessageDecoder::decode_message(&msg, &[0x11, 0x22, 0x33]).unwrap();
        assert_eq!(
            decoded,
            vec![
                ("Zeta".to_string(), SignalValue::Integer(0x33)),
                ("Alpha".to_string(), SignalValue::Integer(0x2211)),
            ]
        );
    }

    #[test]
    fn test_decode_scaled_and_signed() {
        let mut temp = signal("Temp", 0, 8, ByteOrder::LittleEndian);
        temp.offset = -40.0;
        let mut current = signal("Current", 8, 8, ByteOrder::LittleEndian);
        current.value_type = ValueType::Signed;
        current.factor = 0.5;

        let msg = message(2, vec![temp, current]);
        let decoded = MessageDecoder::decode_message(&msg, &[100, 0xFE]).unwrap();

        assert_eq!(decoded[0].1, SignalValue::Integer(60));
        assert_eq!(decoded[1].1, SignalValue::Float(-1.0));
    }

    #[test]
    fn test_decode_value_table() {
        let mut gear = signal("Gear", 0, 2, ByteOrder::LittleEndian);
        gear.value_table = Some(HashMap::from([(3, "Drive".to_string())]));

        let msg = message(1, vec![gear]);
        let decoded = MessageDecoder::decode_message(&msg, &[0x03]).unwrap();
        assert_eq!(decoded[0].1, SignalValue::Symbolic("Drive".to_string()));

        // Raw values without a label stay numeric
        let decoded = MessageDecoder::decode_message(&msg, &[0x01]).unwrap();
        assert_eq!(decoded[0].1, SignalValue::Integer(1));
    }

    #[test]
    fn test_decode_multiplexed_branch_only() {
        let mode = signal("Mode", 0, 8, ByteOrder::LittleEndian);
        let mut a = signal("SignalA", 8, 8, ByteOrder::LittleEndian);
        a.multiplexer_info = Some(MultiplexerInfo {
            multiplexer_signal: "Mode".to_string(),
            multiplexer_values: vec![0],
        });
        let mut b = signal("SignalB", 8, 8, ByteOrder::LittleEndian);
        b.multiplexer_info = Some(MultiplexerInfo {
            multiplexer_signal: "Mode".to_string(),
            multiplexer_values: vec![1],
        });

        let mut msg = message(2, vec![mode, a, b]);
        msg.is_multiplexed = true;
        msg.multiplexer_signal = Some("Mode".to_string());

        let decoded = MessageDecoder::decode_message(&msg, &[0x01, 0x2A]).unwrap();
        let names: Vec<&str> = decoded.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Mode", "SignalB"]);
        assert_eq!(decoded[1].1, SignalValue::Integer(42));
    }

    #[test]
    fn test_short_payload_is_rejected() {
        let msg = message(8, vec![signal("A", 0, 8, ByteOrder::LittleEndian)]);
        let result = MessageDecoder::decode_message(&msg, &[0x01, 0x02]);
        assert!(matches!(
            result,
            Err(DecoderError::PayloadLength {
                expected: 8,
                actual: 2,
                ..
            })
        ));
    }
}
