use crc::Crc;

/// The link uses CRC-16/CCITT: polynomial 0x1021, initial value 0xFFFF, MSB-first,
/// no reflection, no final XOR. The `crc` crate ships this exact variant as
/// `CRC_16_IBM_3740`; its check value over `b"123456789"` is 0x29B1.
pub const LINK_CRC16: Crc<u16> = Crc::<u16>::new(&crc::CRC_16_IBM_3740);
