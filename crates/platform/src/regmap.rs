//! Codec register map abstraction.
//!
//! Arizona-class codecs expose a 32-bit register address space with 16-bit
//! register values. [`RegisterMap`] is the narrow interface the detection
//! engine needs; [`I2cRegmap`] implements it over any `embedded-hal` 1.0
//! I2C bus.
//!
//! Wire format (big-endian, as on the codec control port):
//!
//! ```text
//! write: [A31..A24, A23..A16, A15..A8, A7..A0, D15..D8, D7..D0]
//! read:  write [A31..A0] then read [D15..D8, D7..D0]
//! ```

/// Register read / write / read-modify-write access.
pub trait RegisterMap {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read a register.
    fn read(&mut self, reg: u32) -> Result<u32, Self::Error>;

    /// Write a register.
    fn write(&mut self, reg: u32, val: u32) -> Result<(), Self::Error>;

    /// Replace the bits selected by `mask` with the same bits of `val`.
    fn update_bits(&mut self, reg: u32, mask: u32, val: u32) -> Result<(), Self::Error> {
        self.update_bits_check(reg, mask, val).map(|_| ())
    }

    /// Like [`update_bits`](Self::update_bits) but reports whether the
    /// register value changed. Unchanged registers are not written.
    fn update_bits_check(&mut self, reg: u32, mask: u32, val: u32) -> Result<bool, Self::Error> {
        let old = self.read(reg)?;
        let new = (old & !mask) | (val & mask);
        if new == old {
            return Ok(false);
        }
        self.write(reg, new)?;
        Ok(true)
    }
}

impl<T: RegisterMap + ?Sized> RegisterMap for &mut T {
    type Error = T::Error;

    fn read(&mut self, reg: u32) -> Result<u32, Self::Error> {
        (**self).read(reg)
    }

    fn write(&mut self, reg: u32, val: u32) -> Result<(), Self::Error> {
        (**self).write(reg, val)
    }

    fn update_bits(&mut self, reg: u32, mask: u32, val: u32) -> Result<(), Self::Error> {
        (**self).update_bits(reg, mask, val)
    }

    fn update_bits_check(&mut self, reg: u32, mask: u32, val: u32) -> Result<bool, Self::Error> {
        (**self).update_bits_check(reg, mask, val)
    }
}

/// 7-bit I2C address of the codec control port when CIF1ADDR is low.
pub const ARIZONA_I2C_ADDR: u8 = 0x1A;

/// I2C register map errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegmapError<E> {
    /// Bus transaction failed
    Bus(E),
    /// Value does not fit the 16-bit register width
    ValueTooWide(u32),
}

impl<E: core::fmt::Debug> core::fmt::Display for RegmapError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(_) => write!(f, "Register bus transaction failed"),
            Self::ValueTooWide(val) => write!(f, "Value {val:#x} exceeds 16-bit register width"),
        }
    }
}

/// [`RegisterMap`] over an `embedded-hal` I2C bus.
pub struct I2cRegmap<I> {
    i2c: I,
    addr: u8,
}

impl<I: embedded_hal::i2c::I2c> I2cRegmap<I> {
    /// Wrap a bus; `addr` is the 7-bit codec address.
    pub fn new(i2c: I, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Release the bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: embedded_hal::i2c::I2c> RegisterMap for I2cRegmap<I> {
    type Error = RegmapError<I::Error>;

    fn read(&mut self, reg: u32) -> Result<u32, Self::Error> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.addr, &reg.to_be_bytes(), &mut buf)
            .map_err(RegmapError::Bus)?;
        Ok(u32::from(u16::from_be_bytes(buf)))
    }

    fn write(&mut self, reg: u32, val: u32) -> Result<(), Self::Error> {
        let val = u16::try_from(val).map_err(|_| RegmapError::ValueTooWide(val))?;
        let [a3, a2, a1, a0] = reg.to_be_bytes();
        let [d1, d0] = val.to_be_bytes();
        self.i2c
            .write(self.addr, &[a3, a2, a1, a0, d1, d0])
            .map_err(RegmapError::Bus)
    }
}
