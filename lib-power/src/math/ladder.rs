/*
 * Binary weighted register ladders.
 *
 * The analog setpoints on the chargers are encoded as an offset plus a sum of
 * power-of-two multiples of a base step, one register bit per multiple:
 *
 *   value = offset + sum(bit_i * step * 2^i)
 *
 * Encoding walks the increments from the most significant down, so each
 * target has exactly one bit pattern. Requests between two steps round down.
 */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryLadder {
    offset: u16,
    step: u16,
    bits: u8,
    shift: u8,
    max_value: u16,
}

impl BinaryLadder {
    /// `max_value` caps the accepted domain when the device documents a
    /// smaller range than the field width could express.
    pub const fn new(offset: u16, step: u16, bits: u8, shift: u8, max_value: u16) -> Self {
        BinaryLadder { offset, step, bits, shift, max_value }
    }

    pub const fn min_value(&self) -> u16 {
        self.offset
    }

    pub const fn max_value(&self) -> u16 {
        self.max_value
    }

    /// Register mask covered by the field.
    pub const fn mask(&self) -> u8 {
        (((1u16 << self.bits) - 1) as u8) << self.shift
    }

    pub const fn contains(&self, value: u16) -> bool {
        value >= self.offset && value <= self.max_value
    }

    /// Field code (unshifted) for `value`, or `None` outside the domain.
    pub fn encode(&self, value: u16) -> Option<u8> {
        if !self.contains(value) {
            return None;
        }

        let mut remaining = value - self.offset;
        let mut code = 0u8;
        for bit in (0..self.bits).rev() {
            let increment = self.step << bit;
            if remaining >= increment {
                remaining -= increment;
                code |= 1 << bit;
            }
        }

        Some(code)
    }

    /// Inverse of `encode` for any field code.
    pub fn decode(&self, code: u8) -> u16 {
        let field = code & (self.mask() >> self.shift);
        self.offset + (field as u16) * self.step
    }

    /// Replaces the field inside `register` with an already encoded `code`.
    pub const fn insert(&self, register: u8, code: u8) -> u8 {
        (register & !self.mask()) | ((code << self.shift) & self.mask())
    }

    /// Replaces the field inside `register` with the encoding of `value`.
    pub fn apply(&self, register: u8, value: u16) -> Option<u8> {
        self.encode(value).map(|code| self.insert(register, code))
    }

    /// Decodes the field out of a full register value.
    pub fn extract(&self, register: u8) -> u16 {
        self.decode((register & self.mask()) >> self.shift)
    }
}
