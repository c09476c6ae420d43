/// CRC32 using the IEEE 802.3 polynomial (0xEDB88320, bit-reversed 0x04C11DB7).
///
/// Follows the ESP ROM `crc32_le` convention: `init` is inverted before and
/// the result after the calculation. `crc32_le(u32::MAX, data)` is the
/// checksum stored in OTA select records.
///
/// Also usable as the `FnCrc32` of the bootloader codecs on the host.
pub fn crc32_le(init: u32, data: &[u8]) -> u32 {
    let mut crc = !init;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(crc32_le(0, b"123456789"), 0xCBF43926);
    }

    #[test]
    fn chaining() {
        let whole = crc32_le(0, b"hello world");
        let split = crc32_le(crc32_le(0, b"hello "), b"world");
        assert_eq!(whole, split);
    }
}
