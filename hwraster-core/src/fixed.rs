/// Q16.16 fixed-point conversion matching the hardware's arithmetic
///
/// Values outside the representable range wrap modulo 2^32 exactly like the
/// hardware registers do. Nothing here clamps.

/// Scale factor between a float and its Q16.16 representation (2^16)
pub const SCALE: f64 = 65536.0;

const MODULUS: f64 = 4_294_967_296.0;

/// Smallest value that survives encoding without wrapping
pub const MIN: f64 = -32768.0;
/// Exclusive upper bound of the representable range
pub const MAX: f64 = 32768.0;

/// Encode a float as Q16.16 two's complement bits.
///
/// Truncates toward zero, then reduces modulo 2^32. NaN encodes as 0.
pub fn encode(value: f64) -> u32 {
    let scaled = (value * SCALE).trunc();
    if !scaled.is_finite() {
        return 0;
    }
    // rem_euclid is exact on f64, so wrapping stays bit-exact for any magnitude
    scaled.rem_euclid(MODULUS) as u32
}

/// Decode Q16.16 bits back into a float
pub fn decode(bits: u32) -> f64 {
    bits as i32 as f64 / SCALE
}

/// True when `value` would wrap on encoding
pub fn overflows(value: f64) -> bool {
    !(MIN..MAX).contains(&value)
}

/// Eight upper-case hex digits, the memory-file line format
pub fn to_hex(value: f64) -> String {
    format!("{:08X}", encode(value))
}

/// SystemVerilog sized literal, e.g. `32'h0000C000`
pub fn to_verilog_hex(value: f64) -> String {
    format!("32'h{:08X}", encode(value))
}

/// Pack an 8-bit RGB colour into 12 bits by keeping each channel's top nibble
pub fn rgb444(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 4) << 8) | ((g as u16 >> 4) << 4) | (b as u16 >> 4)
}

/// Three hex digits of [`rgb444`], the texture-memory line format
pub fn rgb444_hex(r: u8, g: u8, b: u8) -> String {
    format!("{:03X}", rgb444(r, g, b))
}
