// bf-core/src/units.rs

use uom::si::f64::{
    Length as UomLength, MassRate as UomMassRate, Power as UomPower,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Length = UomLength;
pub type MassRate = UomMassRate;
pub type Power = UomPower;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn degc(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

/// Celsius reading to kelvin, via uom so the offset lives in one place.
#[inline]
pub fn celsius_to_kelvin(v: f64) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    degc(v).get::<kelvin>()
}

#[inline]
pub fn kelvin_to_celsius(v: f64) -> f64 {
    use uom::si::thermodynamic_temperature::degree_celsius;
    k(v).get::<degree_celsius>()
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

/// Hours to seconds.
#[inline]
pub fn hours_to_seconds(v: f64) -> f64 {
    use uom::si::time::{hour, second};
    Time::new::<hour>(v).get::<second>()
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

pub mod constants {
    /// Seconds in a 365-day year.
    pub const YEAR_S: f64 = 365.0 * 86_400.0;
    /// Universal gas constant, J/(mol·K).
    pub const R_GAS: f64 = 8.314_462_618;
    /// Standard atmosphere, Pa.
    pub const P_ATM_PA: f64 = 101_325.0;
    /// Standard gravity, m/s².
    pub const G0_MPS2: f64 = 9.806_65;
    /// Density of water near 10 °C, kg/m³.
    pub const WATER_DENSITY: f64 = 999.7;
    /// Specific heat of water, J/(kg·K).
    pub const WATER_CP: f64 = 4_186.0;
}
