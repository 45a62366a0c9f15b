use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Values whose magnitude drops below this are printed in exponential notation
const EXPONENTIAL_THRESHOLD: f64 = 1e-5;

/// Decimal places kept by fixed-precision formatting
const FIXED_PRECISION: usize = 6;

/// Errors reported back to the form as inline messages
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("Please enter a valid number")]
    InvalidNumber(String),

    #[error("Please select both a source and a target unit")]
    MissingUnit,

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown unit \"{unit}\" for {category}")]
    UnknownUnit { category: &'static str, unit: String },

    #[error("Cannot convert to a unit with a zero base factor")]
    ZeroBaseFactor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitCategory {
    Length,
    Mass,
    Volume,
    Area,
    Speed,
    Time,
    DataStorage,
    Temperature,
    Currency,
}

/// A unit converted by a plain multiplicative factor.
///
/// `factor` is the size of one unit expressed in the category's base unit,
/// e.g. a kilometre is `1000.0` in a metre-based table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LinearUnit {
    pub name: &'static str,
    pub symbol: &'static str,
    pub factor: f64,
}

const fn unit(name: &'static str, symbol: &'static str, factor: f64) -> LinearUnit {
    LinearUnit {
        name,
        symbol,
        factor,
    }
}

const LENGTH: &[LinearUnit] = &[
    unit("Meter", "m", 1.0),
    unit("Kilometer", "km", 1000.0),
    unit("Centimeter", "cm", 0.01),
    unit("Millimeter", "mm", 0.001),
    unit("Micrometer", "µm", 1e-6),
    unit("Nanometer", "nm", 1e-9),
    unit("Mile", "mi", 1609.344),
    unit("Yard", "yd", 0.9144),
    unit("Foot", "ft", 0.3048),
    unit("Inch", "in", 0.0254),
    unit("Nautical Mile", "nmi", 1852.0),
];

const MASS: &[LinearUnit] = &[
    unit("Kilogram", "kg", 1.0),
    unit("Gram", "g", 0.001),
    unit("Milligram", "mg", 1e-6),
    unit("Metric Ton", "t", 1000.0),
    unit("Pound", "lb", 0.453_592_37),
    unit("Ounce", "oz", 0.028_349_523_125),
    unit("Stone", "st", 6.350_293_18),
];

const VOLUME: &[LinearUnit] = &[
    unit("Liter", "L", 1.0),
    unit("Milliliter", "mL", 0.001),
    unit("Cubic Meter", "m³", 1000.0),
    unit("Gallon (US)", "gal", 3.785_411_784),
    unit("Quart (US)", "qt", 0.946_352_946),
    unit("Pint (US)", "pt", 0.473_176_473),
    unit("Cup (US)", "cup", 0.236_588_236_5),
    unit("Fluid Ounce (US)", "fl oz", 0.029_573_529_562_5),
    unit("Tablespoon", "tbsp", 0.014_786_764_781_25),
    unit("Teaspoon", "tsp", 0.004_928_921_593_75),
];

const AREA: &[LinearUnit] = &[
    unit("Square Meter", "m²", 1.0),
    unit("Square Kilometer", "km²", 1e6),
    unit("Square Centimeter", "cm²", 1e-4),
    unit("Hectare", "ha", 1e4),
    unit("Acre", "ac", 4_046.856_422_4),
    unit("Square Mile", "mi²", 2_589_988.110_336),
    unit("Square Yard", "yd²", 0.836_127_36),
    unit("Square Foot", "ft²", 0.092_903_04),
    unit("Square Inch", "in²", 0.000_645_16),
];

const SPEED: &[LinearUnit] = &[
    unit("Meter per Second", "m/s", 1.0),
    unit("Kilometer per Hour", "km/h", 1.0 / 3.6),
    unit("Mile per Hour", "mph", 0.44704),
    unit("Knot", "kn", 1852.0 / 3600.0),
    unit("Foot per Second", "ft/s", 0.3048),
];

const TIME: &[LinearUnit] = &[
    unit("Second", "s", 1.0),
    unit("Millisecond", "ms", 0.001),
    unit("Minute", "min", 60.0),
    unit("Hour", "h", 3600.0),
    unit("Day", "d", 86_400.0),
    unit("Week", "wk", 604_800.0),
    unit("Month", "mo", 2_629_746.0),
    unit("Year", "yr", 31_556_952.0),
];

const DATA_STORAGE: &[LinearUnit] = &[
    unit("Bit", "b", 0.125),
    unit("Byte", "B", 1.0),
    unit("Kilobyte", "KB", 1024.0),
    unit("Megabyte", "MB", 1_048_576.0),
    unit("Gigabyte", "GB", 1_073_741_824.0),
    unit("Terabyte", "TB", 1_099_511_627_776.0),
    unit("Petabyte", "PB", 1_125_899_906_842_624.0),
];

// Static rates against the US dollar. Not live data.
const CURRENCY: &[LinearUnit] = &[
    unit("US Dollar", "USD", 1.0),
    unit("Euro", "EUR", 1.08),
    unit("British Pound", "GBP", 1.27),
    unit("Japanese Yen", "JPY", 0.0067),
    unit("Indian Rupee", "INR", 0.012),
    unit("Canadian Dollar", "CAD", 0.73),
    unit("Australian Dollar", "AUD", 0.66),
    unit("Swiss Franc", "CHF", 1.13),
    unit("Chinese Yuan", "CNY", 0.14),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    pub const ALL: [TemperatureUnit; 3] = [
        TemperatureUnit::Celsius,
        TemperatureUnit::Fahrenheit,
        TemperatureUnit::Kelvin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "Celsius",
            TemperatureUnit::Fahrenheit => "Fahrenheit",
            TemperatureUnit::Kelvin => "Kelvin",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Kelvin => "K",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|u| {
            u.name().eq_ignore_ascii_case(name)
                || u.symbol().eq_ignore_ascii_case(name)
                || u.symbol().trim_start_matches('°').eq_ignore_ascii_case(name)
        })
    }
}

impl UnitCategory {
    pub const ALL: [UnitCategory; 9] = [
        UnitCategory::Length,
        UnitCategory::Mass,
        UnitCategory::Volume,
        UnitCategory::Area,
        UnitCategory::Speed,
        UnitCategory::Time,
        UnitCategory::DataStorage,
        UnitCategory::Temperature,
        UnitCategory::Currency,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            UnitCategory::Length => "Length",
            UnitCategory::Mass => "Mass",
            UnitCategory::Volume => "Volume",
            UnitCategory::Area => "Area",
            UnitCategory::Speed => "Speed",
            UnitCategory::Time => "Time",
            UnitCategory::DataStorage => "Data Storage",
            UnitCategory::Temperature => "Temperature",
            UnitCategory::Currency => "Currency",
        }
    }

    /// Accepts the label ("Data Storage") or the kebab-case key ("data-storage")
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace([' ', '_'], "-");
        Self::ALL
            .into_iter()
            .find(|c| c.label().to_lowercase().replace(' ', "-") == normalized)
    }

    /// Linear units of the category; empty for temperature
    pub fn linear_units(&self) -> &'static [LinearUnit] {
        match self {
            UnitCategory::Length => LENGTH,
            UnitCategory::Mass => MASS,
            UnitCategory::Volume => VOLUME,
            UnitCategory::Area => AREA,
            UnitCategory::Speed => SPEED,
            UnitCategory::Time => TIME,
            UnitCategory::DataStorage => DATA_STORAGE,
            UnitCategory::Currency => CURRENCY,
            UnitCategory::Temperature => &[],
        }
    }

    /// Unit names offered by the category's unit pickers
    pub fn unit_names(&self) -> Vec<&'static str> {
        match self {
            UnitCategory::Temperature => TemperatureUnit::ALL.iter().map(|u| u.name()).collect(),
            _ => self.linear_units().iter().map(|u| u.name).collect(),
        }
    }

    fn find_linear(&self, name: &str) -> Result<&'static LinearUnit, UnitError> {
        let wanted = name.trim();
        self.linear_units()
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(wanted) || u.symbol == wanted)
            .ok_or_else(|| UnitError::UnknownUnit {
                category: self.label(),
                unit: wanted.to_string(),
            })
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a successful conversion, ready for display
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub category: UnitCategory,
    pub value: f64,
    pub from: String,
    pub to: String,
    pub result: f64,
    pub formatted: String,
}

/// Scales `value` from one linear unit to another.
///
/// A zero target factor can only be reached from another zero-factor unit;
/// in that case the value passes through unchanged.
pub fn convert_linear(value: f64, from_factor: f64, to_factor: f64) -> Result<f64, UnitError> {
    if to_factor == 0.0 {
        if from_factor != 0.0 {
            return Err(UnitError::ZeroBaseFactor);
        }
        return Ok(value);
    }
    Ok(value * from_factor / to_factor)
}

pub fn convert_temperature(value: f64, from: TemperatureUnit, to: TemperatureUnit) -> f64 {
    let celsius = match from {
        TemperatureUnit::Celsius => value,
        TemperatureUnit::Fahrenheit => (value - 32.0) * 5.0 / 9.0,
        TemperatureUnit::Kelvin => value - 273.15,
    };

    match to {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        TemperatureUnit::Kelvin => celsius + 273.15,
    }
}

/// Convert `value` between two units of the same category.
///
/// # Arguments
/// * `category` - Category both units belong to
/// * `value` - Amount expressed in `from`
/// * `from` - Unit name or symbol of the input
/// * `to` - Unit name or symbol of the output
///
/// # Returns
/// * `Result<f64, UnitError>` - The converted amount or an inline message
pub fn convert(category: UnitCategory, value: f64, from: &str, to: &str) -> Result<f64, UnitError> {
    if from.trim().is_empty() || to.trim().is_empty() {
        return Err(UnitError::MissingUnit);
    }

    if category == UnitCategory::Temperature {
        let unknown = |unit: &str| UnitError::UnknownUnit {
            category: category.label(),
            unit: unit.trim().to_string(),
        };
        let from_unit = TemperatureUnit::parse(from).ok_or_else(|| unknown(from))?;
        let to_unit = TemperatureUnit::parse(to).ok_or_else(|| unknown(to))?;
        return Ok(convert_temperature(value, from_unit, to_unit));
    }

    let from_unit = category.find_linear(from)?;
    let to_unit = category.find_linear(to)?;
    convert_linear(value, from_unit.factor, to_unit.factor)
}

/// Form entry point: every field arrives as raw text.
pub fn convert_input(category: &str, value: &str, from: &str, to: &str) -> Result<Conversion, UnitError> {
    let category =
        UnitCategory::parse(category).ok_or_else(|| UnitError::UnknownCategory(category.to_string()))?;

    let trimmed = value.trim();
    let value: f64 = trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| UnitError::InvalidNumber(trimmed.to_string()))?;

    let result = convert(category, value, from, to)?;
    log::debug!("converted {value} {from} -> {result} {to} ({category})");

    Ok(Conversion {
        category,
        value,
        from: from.trim().to_string(),
        to: to.trim().to_string(),
        result,
        formatted: format_value(result),
    })
}

/// Fixed precision with trailing zeros trimmed, or exponential notation for
/// tiny non-zero magnitudes.
pub fn format_value(value: f64) -> String {
    if value != 0.0 && value.abs() < EXPONENTIAL_THRESHOLD {
        return format!("{:.*e}", FIXED_PRECISION, value);
    }

    let fixed = format!("{:.*}", FIXED_PRECISION, value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
