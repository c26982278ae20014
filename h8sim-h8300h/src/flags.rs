//! The condition code register and the flag arithmetic of data operations.

use std::fmt;

use crate::isa::{Condition, Size};

const CCR_I: u8 = 0b1000_0000;
const CCR_UI: u8 = 0b0100_0000;
const CCR_H: u8 = 0b0010_0000;
const CCR_U: u8 = 0b0001_0000;
const CCR_N: u8 = 0b0000_1000;
const CCR_Z: u8 = 0b0000_0100;
const CCR_V: u8 = 0b0000_0010;
const CCR_C: u8 = 0b0000_0001;

/// CCR as individual bits. I, UI and U are never touched by modelled
/// instructions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Flags {
    pub i: bool,
    pub ui: bool,
    pub h: bool,
    pub u: bool,
    pub n: bool,
    pub z: bool,
    pub v: bool,
    pub c: bool,
}

/// Flags produced by one data operation. `None` leaves the flag as it was.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FlagUpdate {
    pub h: Option<bool>,
    pub n: bool,
    pub z: bool,
    pub v: bool,
    pub c: Option<bool>,
}

impl Flags {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn apply(&mut self, update: FlagUpdate) {
        if let Some(h) = update.h {
            self.h = h;
        }
        self.n = update.n;
        self.z = update.z;
        self.v = update.v;
        if let Some(c) = update.c {
            self.c = c;
        }
    }

    pub fn to_ccr(&self) -> u8 {
        [
            (self.i, CCR_I),
            (self.ui, CCR_UI),
            (self.h, CCR_H),
            (self.u, CCR_U),
            (self.n, CCR_N),
            (self.z, CCR_Z),
            (self.v, CCR_V),
            (self.c, CCR_C),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |ccr, (_, bit)| ccr | bit)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "I: {}, H: {}, N: {}, Z: {}, V: {}, C: {}",
            u8::from(self.i),
            u8::from(self.h),
            u8::from(self.n),
            u8::from(self.z),
            u8::from(self.v),
            u8::from(self.c)
        )
    }
}

/// Flags for `op1 + op2` at `size`. Operands are truncated to `size` first.
pub fn compute_add(op1: u32, op2: u32, size: Size) -> FlagUpdate {
    let mask = size.mask();
    let (op1, op2) = (op1 & mask, op2 & mask);
    let full = u64::from(op1) + u64::from(op2);
    let sum = (full as u32) & mask;
    let sign = size.sign_bit();
    let half = size.half_mask();

    FlagUpdate {
        h: Some((op1 & half) + (op2 & half) > half),
        n: sum & sign != 0,
        z: sum == 0,
        v: !(op1 ^ op2) & (op1 ^ sum) & sign != 0,
        c: Some(full > u64::from(mask)),
    }
}

/// Flags for a data move of `value`. H and C are not affected by moves.
pub fn compute_move(value: u32, size: Size) -> FlagUpdate {
    let value = value & size.mask();
    FlagUpdate {
        h: None,
        n: value & size.sign_bit() != 0,
        z: value == 0,
        v: false,
        c: None,
    }
}

impl Condition {
    pub fn evaluate(self, flags: &Flags) -> bool {
        let Flags { n, z, v, c, .. } = *flags;
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::Higher => !c && !z,
            Condition::LowerOrSame => c || z,
            Condition::CarryClear => !c,
            Condition::CarrySet => c,
            Condition::NotEqual => !z,
            Condition::Equal => z,
            Condition::OverflowClear => !v,
            Condition::OverflowSet => v,
            Condition::Plus => !n,
            Condition::Minus => n,
            Condition::GreaterOrEqual => n == v,
            Condition::LessThan => n != v,
            Condition::GreaterThan => !z && n == v,
            Condition::LessOrEqual => z || n != v,
        }
    }
}
