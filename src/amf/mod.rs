mod scanner;

pub use scanner::*;

// AMF0 type markers
pub mod markers {
    pub const NUMBER: u8 = 0x00; // Big-endian IEEE-754 double
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02; // u16 length prefix, no trailing NUL
    pub const OBJECT: u8 = 0x03;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07; // u16 table index
    pub const ECMA_ARRAY: u8 = 0x08; // u32 count, then object-style pairs
    pub const OBJECT_END: u8 = 0x09;
}
