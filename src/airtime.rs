//! LoRa PHY time-on-air calculation.
//!
//! Pure functions over payload size and radio parameters; the decoder calls
//! this for every uplink and the result feeds duty-cycle and utilization
//! KPIs downstream. Times are in milliseconds throughout.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{CalculationError, DecodeError};

const KHZ_TO_HZ: f64 = 1000.0;
/// Preamble carries 4.25 symbols beyond the programmed count.
const FIXED_PREAMBLE_SYMBOLS: f64 = 4.25;
/// Symbol duration above which low-data-rate optimization engages in auto mode.
const LDRO_SYMBOL_MS_THRESHOLD: f64 = 16.0;

/// Radio parameters beyond payload size and spreading factor. Defaults match
/// the EU868 uplink settings the network runs with.
#[derive(Debug, Clone)]
pub struct ToaParams {
    pub bandwidth_khz: f64,
    /// Engage low-data-rate optimization automatically from the symbol time
    pub auto_low_data_rate: bool,
    /// Forced LDRO, honored only when auto mode is off
    pub low_data_rate: bool,
    pub implicit_header: bool,
    pub crc_enabled: bool,
    /// 1 => 4/5, 2 => 4/6, ...
    pub coding_rate_index: u32,
    pub preamble_symbols: u32,
}

impl Default for ToaParams {
    fn default() -> Self {
        Self {
            bandwidth_khz: 125.0,
            auto_low_data_rate: true,
            low_data_rate: false,
            implicit_header: false,
            crc_enabled: true,
            coding_rate_index: 1,
            preamble_symbols: 8,
        }
    }
}

/// Computed air times in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOnAir {
    pub payload_ms: f64,
    /// Preamble plus payload, rounded to 3 decimals
    pub packet_ms: f64,
}

/// Computes LoRa PHY time-on-air for one transmission.
///
/// Non-positive payload size or spreading factor is a [`CalculationError`];
/// such a frame would never have been modulated.
pub fn calculate_toa(
    payload_size: i64,
    spreading_factor: i64,
    params: &ToaParams,
) -> Result<TimeOnAir, CalculationError> {
    if payload_size <= 0 || spreading_factor <= 0 {
        return Err(CalculationError {
            payload_size,
            spreading_factor,
        });
    }

    let sf = spreading_factor as f64;
    let symbol_rate = (params.bandwidth_khz * KHZ_TO_HZ) / 2_f64.powf(sf);
    let symbol_ms = KHZ_TO_HZ / symbol_rate;
    let preamble_ms = (params.preamble_symbols as f64 + FIXED_PREAMBLE_SYMBOLS) * symbol_ms;

    let ldro = if (params.auto_low_data_rate && symbol_ms > LDRO_SYMBOL_MS_THRESHOLD)
        || (!params.auto_low_data_rate && params.low_data_rate)
    {
        1.0
    } else {
        0.0
    };
    let implicit_header = if params.implicit_header { 1.0 } else { 0.0 };
    let crc = if params.crc_enabled { 1.0 } else { 0.0 };

    let numerator =
        8.0 * payload_size as f64 - 4.0 * sf + 28.0 + 16.0 * crc - 20.0 * implicit_header;
    let denominator = 4.0 * (sf - 2.0 * ldro);
    let payload_symbols = 8.0
        + ((numerator / denominator).ceil() * (params.coding_rate_index as f64 + 4.0)).max(0.0);
    let payload_ms = payload_symbols * symbol_ms;
    let packet_ms = round_ms(preamble_ms + payload_ms);

    Ok(TimeOnAir {
        payload_ms,
        packet_ms,
    })
}

/// Byte length of the base64-encoded PHY payload carried by an uplink.
pub fn payload_size(raw_payload: &str) -> Result<i32, DecodeError> {
    let decoded = BASE64.decode(raw_payload)?;
    Ok(decoded.len() as i32)
}

fn round_ms(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sf7_short_frame() {
        let toa = calculate_toa(12, 7, &ToaParams::default()).unwrap();
        assert_relative_eq!(toa.packet_ms, 41.216, epsilon = 1e-9);
    }

    #[test]
    fn sf7_twenty_byte_frame() {
        let toa = calculate_toa(20, 7, &ToaParams::default()).unwrap();
        assert_relative_eq!(toa.packet_ms, 56.576, epsilon = 1e-9);
    }

    #[test]
    fn sf12_engages_ldro_automatically() {
        // 32.768 ms symbols at SF12/125k exceed the 16 ms threshold
        let toa = calculate_toa(12, 12, &ToaParams::default()).unwrap();
        assert_relative_eq!(toa.packet_ms, 1155.072, epsilon = 1e-9);

        let mut no_ldro = ToaParams::default();
        no_ldro.auto_low_data_rate = false;
        let without = calculate_toa(12, 12, &no_ldro).unwrap();
        assert!(without.packet_ms < toa.packet_ms);
    }

    #[test]
    fn crc_and_header_bits_change_symbol_count() {
        let base = calculate_toa(20, 7, &ToaParams::default()).unwrap();

        let mut no_crc = ToaParams::default();
        no_crc.crc_enabled = false;
        let without_crc = calculate_toa(20, 7, &no_crc).unwrap();
        assert!(without_crc.packet_ms < base.packet_ms);

        let mut implicit = ToaParams::default();
        implicit.implicit_header = true;
        let implicit_toa = calculate_toa(20, 7, &implicit).unwrap();
        assert!(implicit_toa.packet_ms <= base.packet_ms);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        assert!(calculate_toa(0, 7, &ToaParams::default()).is_err());
        assert!(calculate_toa(-3, 7, &ToaParams::default()).is_err());
        assert!(calculate_toa(20, 0, &ToaParams::default()).is_err());
    }

    #[test]
    fn payload_size_decodes_base64() {
        assert_eq!(payload_size("AQIDBA==").unwrap(), 4);
        assert!(payload_size("not base64!!").is_err());
    }
}
