use std::ops::RangeInclusive;

/// Data bits carried by a Panasonic transmission.
pub const CODE_BITS: u32 = 48;

pub const HEADER_MARK_NOMINAL_US: u64 = 3502;
pub const HEADER_SPACE_NOMINAL_US: u64 = 1750;
pub const BIT_MARK_NOMINAL_US: u64 = 502;
pub const ZERO_SPACE_NOMINAL_US: u64 = 400;
pub const ONE_SPACE_NOMINAL_US: u64 = 1244;

/// Accepted windows: nominal ± 50%, inclusive, to tolerate oscillator
/// drift on either end of the link. Early receivers used a 1001 µs lower
/// bound for the header mark; the ± 50% bound is the canonical one.
pub const HEADER_MARK_WINDOW_US: RangeInclusive<u64> = 1751..=5253;
pub const HEADER_SPACE_WINDOW_US: RangeInclusive<u64> = 875..=2625;
pub const BIT_MARK_WINDOW_US: RangeInclusive<u64> = 251..=753;
pub const ZERO_SPACE_WINDOW_US: RangeInclusive<u64> = 200..=600;
pub const ONE_SPACE_WINDOW_US: RangeInclusive<u64> = 622..=1866;
